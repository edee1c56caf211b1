use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub industry: String,
}

/// A measurable outcome. Plain statements come from the basic role schema,
/// metric/value pairs from the measured one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Impact {
    Statement(String),
    Measured { metric: String, value: String },
}

/// Distilled description of one role. Fields stay empty when the source
/// text gives no signal for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredRole {
    pub activities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responsibilities: Vec<String>,
    pub skills: Vec<String>,
    pub impact: Vec<Impact>,
}

impl StructuredRole {
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
            && self.responsibilities.is_empty()
            && self.skills.is_empty()
            && self.impact.is_empty()
    }
}

/// One position in a user's work history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub id: String,
    pub company: Company,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start_date: NaiveDate,
    /// `None` means the role is current; stored as `"present"`.
    #[serde(default, with = "open_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub user_description_inputs: Vec<String>,
    #[serde(default)]
    pub structured_role_description: Option<StructuredRole>,
    /// Set when the last normalization pass failed for this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization_error: Option<String>,
}

/// A role as submitted at history capture time.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    #[serde(default)]
    pub id: Option<String>,
    pub company: Company,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default, with = "open_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub user_description_inputs: Vec<String>,
}

impl NewRole {
    /// Builds the stored entry. When no free-text inputs were supplied the
    /// profile description becomes the first one.
    pub fn into_entry(self) -> RoleEntry {
        let mut inputs = self.user_description_inputs;
        if inputs.is_empty() && !self.description.trim().is_empty() {
            inputs.push(self.description.clone());
        }

        RoleEntry {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            company: self.company,
            title: self.title,
            description: self.description,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            user_description_inputs: inputs,
            structured_role_description: None,
            normalization_error: None,
        }
    }
}

/// Serde adapter for an end date that may be open.
pub(crate) mod open_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const PRESENT: &str = "present";
    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format(FORMAT).to_string()),
            None => s.serialize_str(PRESENT),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) if s.eq_ignore_ascii_case(PRESENT) => Ok(None),
            Some(s) => NaiveDate::parse_from_str(s, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
