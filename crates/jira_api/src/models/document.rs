use serde::Serialize;

/// Minimal Atlassian Document Format body: one paragraph of plain text.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AdfDocument {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u8,
    content: Vec<AdfBlock>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
struct AdfBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    content: Vec<AdfText>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
struct AdfText {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

impl AdfDocument {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: "doc",
            version: 1,
            content: vec![AdfBlock {
                kind: "paragraph",
                content: vec![AdfText {
                    kind: "text",
                    text: text.into(),
                }],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AdfDocument;
    use serde_json::json;

    #[test]
    fn paragraph_serializes_to_adf_doc() {
        let value = serde_json::to_value(AdfDocument::paragraph("hello")).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "doc",
                "version": 1,
                "content": [{"type": "paragraph", "content": [{"type": "text", "text": "hello"}]}]
            })
        );
    }
}
