//! Minimal reader for the XML input descriptor: a root element carrying
//! `<version>`, `<archives>`, and the optional `<skip_packages>` and
//! `<packages>` lists, each newline-separated. Comments are stripped before
//! parsing.

use anyhow::Result;

use crate::error::CheckError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputDescriptor {
    pub version: String,
    pub archives: Vec<String>,
    pub skip_packages: Vec<String>,
    pub keep_packages: Vec<String>,
}

pub fn parse_descriptor(text: &str) -> Result<InputDescriptor> {
    let cleaned = strip_comments(text);

    let archives = list_body(&cleaned, "archives");
    if archives.is_empty() {
        return Err(CheckError::Access("descriptor has no <archives> entries".to_string()).into());
    }

    Ok(InputDescriptor {
        version: tag_body(&cleaned, "version").unwrap_or_default().trim().to_string(),
        archives,
        skip_packages: list_body(&cleaned, "skip_packages"),
        keep_packages: list_body(&cleaned, "packages"),
    })
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

fn tag_body<'t>(text: &'t str, tag: &str) -> Option<&'t str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(&close)? + start;
    Some(&text[start..end])
}

fn list_body(text: &str, tag: &str) -> Vec<String> {
    tag_body(text, tag)
        .map(|body| {
            body.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_descriptor() {
        let text = r#"<descriptor>
    <version>
        2.1
    </version>

    <archives>
        /opt/libs/widget-2.1.jar
        /opt/libs/widget-extras-2.1.jar
    </archives>

    <skip_packages>
        org.sample.generated
    </skip_packages>

    <packages>
        org.sample
    </packages>
</descriptor>
"#;
        let descriptor = parse_descriptor(text).unwrap();
        assert_eq!(descriptor.version, "2.1");
        assert_eq!(
            descriptor.archives,
            vec!["/opt/libs/widget-2.1.jar", "/opt/libs/widget-extras-2.1.jar"]
        );
        assert_eq!(descriptor.skip_packages, vec!["org.sample.generated"]);
        assert_eq!(descriptor.keep_packages, vec!["org.sample"]);
    }

    #[test]
    fn comments_are_stripped_before_parsing() {
        let text = r#"<descriptor>
    <version>3.0</version>
    <!-- <archives>commented-out.jar</archives> -->
    <archives>
        real.jar
    </archives>
</descriptor>
"#;
        let descriptor = parse_descriptor(text).unwrap();
        assert_eq!(descriptor.archives, vec!["real.jar"]);
        assert_eq!(descriptor.version, "3.0");
    }

    #[test]
    fn missing_archives_is_an_access_error() {
        let err = parse_descriptor("<descriptor><version>1</version></descriptor>").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CheckError>(),
            Some(CheckError::Access(_))
        ));
    }
}
