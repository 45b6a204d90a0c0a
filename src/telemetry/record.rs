use serde::ser::{Serialize, SerializeMap, Serializer};

/// Log-type discriminator stamped into every emitted object.
pub const LOG_TYPE: &str = "Performance";

/// One flattened output object: an ordered list of (key, value) pairs.
///
/// The output format permits repeated keys (duplicate numeric-fact names,
/// or a key used as both property and flag), so this is a pair list driven
/// through `serde_json` by hand rather than a `serde_json::Map`.
#[derive(Debug, Clone)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    Number(i64),
    Flag(bool),
}

impl Record {
    pub fn with_capacity(fields: usize) -> Self {
        Self {
            fields: Vec::with_capacity(fields),
        }
    }

    pub fn push_text(&mut self, key: &str, value: &str) {
        self.fields
            .push((key.to_string(), FieldValue::Text(value.to_string())));
    }

    pub fn push_number(&mut self, key: &str, value: i64) {
        self.fields.push((key.to_string(), FieldValue::Number(value)));
    }

    pub fn push_flag(&mut self, key: &str, value: bool) {
        self.fields.push((key.to_string(), FieldValue::Flag(value)));
    }

    /// Renders the object as JSON text. Keys are emitted in push order.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            match value {
                FieldValue::Text(text) => map.serialize_entry(key, text)?,
                FieldValue::Number(number) => map.serialize_entry(key, number)?,
                FieldValue::Flag(flag) => map.serialize_entry(key, flag)?,
            }
        }
        map.end()
    }
}
