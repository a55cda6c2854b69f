use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectType {
    #[serde(rename = "Renewable Energy")]
    RenewableEnergy,
    Afforestation,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<String>,
}

/// Flat project record accumulated across the wizard steps.
///
/// Every field is optional: the record is only judged by the backend on submit.
/// Fields the steps add beyond the known set land in `extra` and are sent as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectDraft {
    // Type selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methodology: Option<String>,

    // Basic info
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "projectID", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crediting_period_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crediting_period_end: Option<String>,

    // Technical data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_capacity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_generation: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A partial update to a [`ProjectDraft`], as one step screen emits it.
///
/// Known fields are tri-state: `None` leaves the field alone, `Some(None)`
/// clears it (an explicit JSON `null`), `Some(Some(v))` sets it. An explicit
/// `null` for an extra key removes that key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DraftPatch {
    #[serde(deserialize_with = "explicit")]
    pub project_type: Option<Option<ProjectType>>,
    #[serde(deserialize_with = "explicit")]
    pub registry: Option<Option<String>>,
    #[serde(deserialize_with = "explicit")]
    pub methodology: Option<Option<String>>,
    #[serde(deserialize_with = "explicit")]
    pub name: Option<Option<String>>,
    #[serde(rename = "projectID", deserialize_with = "explicit")]
    pub project_id: Option<Option<String>>,
    #[serde(deserialize_with = "explicit")]
    pub location: Option<Option<Location>>,
    #[serde(deserialize_with = "explicit")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "explicit")]
    pub start_date: Option<Option<String>>,
    #[serde(deserialize_with = "explicit")]
    pub crediting_period_start: Option<Option<String>>,
    #[serde(deserialize_with = "explicit")]
    pub crediting_period_end: Option<Option<String>>,
    #[serde(deserialize_with = "explicit")]
    pub installed_capacity: Option<Option<String>>,
    #[serde(deserialize_with = "explicit")]
    pub estimated_generation: Option<Option<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keeps a present `null` apart from a missing key.
fn explicit<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl DraftPatch {
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl From<ProjectDraft> for DraftPatch {
    /// Every field set on the draft is set by the patch; unset fields are left alone.
    fn from(draft: ProjectDraft) -> Self {
        Self {
            project_type: draft.project_type.map(Some),
            registry: draft.registry.map(Some),
            methodology: draft.methodology.map(Some),
            name: draft.name.map(Some),
            project_id: draft.project_id.map(Some),
            location: draft.location.map(Some),
            description: draft.description.map(Some),
            start_date: draft.start_date.map(Some),
            crediting_period_start: draft.crediting_period_start.map(Some),
            crediting_period_end: draft.crediting_period_end.map(Some),
            installed_capacity: draft.installed_capacity.map(Some),
            estimated_generation: draft.estimated_generation.map(Some),
            extra: draft.extra,
        }
    }
}

fn apply<T>(slot: &mut Option<T>, change: Option<Option<T>>) {
    if let Some(value) = change {
        *slot = value;
    }
}

impl ProjectDraft {
    /// Builds a draft from an arbitrary JSON object.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Shallow merge. Nested values such as `location` are replaced whole.
    pub fn merge(&mut self, patch: impl Into<DraftPatch>) {
        let DraftPatch {
            project_type,
            registry,
            methodology,
            name,
            project_id,
            location,
            description,
            start_date,
            crediting_period_start,
            crediting_period_end,
            installed_capacity,
            estimated_generation,
            extra,
        } = patch.into();

        apply(&mut self.project_type, project_type);
        apply(&mut self.registry, registry);
        apply(&mut self.methodology, methodology);
        apply(&mut self.name, name);
        apply(&mut self.project_id, project_id);
        apply(&mut self.location, location);
        apply(&mut self.description, description);
        apply(&mut self.start_date, start_date);
        apply(&mut self.crediting_period_start, crediting_period_start);
        apply(&mut self.crediting_period_end, crediting_period_end);
        apply(&mut self.installed_capacity, installed_capacity);
        apply(&mut self.estimated_generation, estimated_generation);
        for (key, value) in extra {
            if value.is_null() {
                self.extra.remove(&key);
            } else {
                self.extra.insert(key, value);
            }
        }
    }
}
