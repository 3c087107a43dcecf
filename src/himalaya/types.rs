use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub name: Option<String>,
    pub addr: String,
}

/// Sender as reported by the backend: either an address object or a
/// preformatted string
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Sender {
    Address(Address),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Seen,
    Answered,
    Flagged,
    Deleted,
    Draft,
    Other,
}

impl Flag {
    fn parse(s: &str) -> Self {
        match s.trim_start_matches('\\').to_ascii_lowercase().as_str() {
            "seen" => Flag::Seen,
            "answered" => Flag::Answered,
            "flagged" => Flag::Flagged,
            "deleted" => Flag::Deleted,
            "draft" => Flag::Draft,
            _ => Flag::Other,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "flag_list")]
    pub flags: Vec<Flag>,
    pub subject: Option<String>,
    #[serde(alias = "sender")]
    pub from: Option<Sender>,
    pub date: Option<String>,
    #[serde(default)]
    pub has_attachment: bool,
}

impl Envelope {
    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn is_seen(&self) -> bool {
        self.has_flag(Flag::Seen)
    }

    pub fn from_display(&self) -> String {
        match &self.from {
            Some(Sender::Address(addr)) => addr.name.clone().unwrap_or_else(|| addr.addr.clone()),
            Some(Sender::Text(text)) => text.clone(),
            None => "(unknown)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Mailbox {
    #[serde(default)]
    pub delim: String,
    pub name: String,
    #[serde(default, alias = "attributes", alias = "desc", deserialize_with = "attr_list")]
    pub attrs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub backend: String,
    #[serde(default, alias = "is_default")]
    pub default: bool,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

fn flag_list<'de, D>(deserializer: D) -> Result<Vec<Flag>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .map(|s| Flag::parse(s))
        .collect())
}

/// Attributes arrive as a list of strings, a single string, or objects like
/// `{"Custom": "\\Sent"}` depending on the backend version
fn attr_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    fn flatten(value: Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) if !s.is_empty() => out.push(s),
            Value::Array(items) => items.into_iter().for_each(|v| flatten(v, out)),
            Value::Object(map) => map.into_iter().for_each(|(k, v)| match v {
                Value::Null => out.push(k),
                other => flatten(other, out),
            }),
            _ => {}
        }
    }

    let mut out = Vec::new();
    flatten(Value::deserialize(deserializer)?, &mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_accepts_numeric_id_and_sender_string() {
        let env: Envelope = serde_json::from_str(
            r#"{"id":101,"flags":["Seen","Flagged"],"subject":"Hi","sender":"Ann","date":"2026-02-02 04:11+00:00"}"#,
        )
        .unwrap();
        assert_eq!(env.id, "101");
        assert!(env.is_seen());
        assert!(env.has_flag(Flag::Flagged));
        assert!(!env.has_flag(Flag::Answered));
        assert_eq!(env.from_display(), "Ann");
        assert!(!env.has_attachment);
    }

    #[test]
    fn test_envelope_with_address_and_null_fields() {
        let env: Envelope = serde_json::from_str(
            r#"{"id":"7","flags":null,"subject":null,"from":{"name":null,"addr":"x@y.z"},"date":null,"has_attachment":true}"#,
        )
        .unwrap();
        assert!(env.flags.is_empty());
        assert_eq!(env.from_display(), "x@y.z");
        assert!(env.has_attachment);
    }

    #[test]
    fn test_mailbox_attribute_shapes() {
        let list: Mailbox =
            serde_json::from_str(r#"{"delim":"/","name":"INBOX","attrs":["NoSelect"]}"#).unwrap();
        assert_eq!(list.attrs, vec!["NoSelect"]);

        let text: Mailbox =
            serde_json::from_str(r#"{"delim":".","name":"Sent","desc":"\\Sent"}"#).unwrap();
        assert_eq!(text.attrs, vec!["\\Sent"]);

        let objects: Mailbox = serde_json::from_str(
            r#"{"delim":"/","name":"Trash","attrs":[{"Custom":"\\Trash"},{"NoInferiors":null}]}"#,
        )
        .unwrap();
        assert_eq!(objects.attrs, vec!["\\Trash", "NoInferiors"]);
    }

    #[test]
    fn test_flag_parse_is_case_insensitive() {
        assert_eq!(Flag::parse("\\Seen"), Flag::Seen);
        assert_eq!(Flag::parse("answered"), Flag::Answered);
        assert_eq!(Flag::parse("$Junk"), Flag::Other);
    }
}
