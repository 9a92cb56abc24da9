use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::ApiError,
    store::{present, OwnedResource, Record, SqliteQuery},
};

pub const BUTTON_CATEGORIES: [&str; 7] = [
    "Navigation",
    "Action",
    "Social",
    "External",
    "Tool",
    "Resource",
    "Other",
];

pub const BUTTON_COLORS: [&str; 7] = ["blue", "green", "red", "purple", "orange", "pink", "gray"];

/// A user-defined dashboard link.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomButton {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: Record,
    pub label: String,
    pub url: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomButton {
    pub label: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

/// Nullable columns take `Some(None)` for an explicit `null`. A `null` sent
/// for `label`, `url` or `isActive` is treated as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomButtonPatch {
    pub label: Option<String>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl OwnedResource for CustomButton {
    type Draft = NewCustomButton;
    type Patch = CustomButtonPatch;

    const TABLE: &'static str = "custom_buttons";
    const FIELDS: &'static [&'static str] = &[
        "label",
        "url",
        "description",
        "icon",
        "color",
        "category",
        "is_active",
    ];
    const SINGULAR: &'static str = "custom button";
    const PLURAL: &'static str = "custom buttons";
    const NOT_FOUND: &'static str = "Button not found";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn from_draft(draft: NewCustomButton, record: Record) -> Result<Self, ApiError> {
        let (Some(label), Some(url)) = (non_empty(draft.label), non_empty(draft.url)) else {
            return Err(ApiError::BadRequest(
                "Label and URL are required".to_string(),
            ));
        };

        let color = non_empty(draft.color);
        let category = non_empty(draft.category);
        check_choice("color", color.as_deref(), &BUTTON_COLORS)?;
        check_choice("category", category.as_deref(), &BUTTON_CATEGORIES)?;

        Ok(Self {
            record,
            label,
            url,
            description: non_empty(draft.description),
            icon: non_empty(draft.icon),
            color,
            category,
            is_active: draft.is_active.unwrap_or(true),
        })
    }

    fn validate_patch(patch: &CustomButtonPatch) -> Result<(), ApiError> {
        check_choice("color", patch.color.clone().flatten().as_deref(), &BUTTON_COLORS)?;
        check_choice(
            "category",
            patch.category.clone().flatten().as_deref(),
            &BUTTON_CATEGORIES,
        )
    }

    fn merge(&mut self, patch: CustomButtonPatch) {
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        // An empty choice clears the field.
        if let Some(color) = patch.color {
            self.color = non_empty(color);
        }
        if let Some(category) = patch.category {
            self.category = non_empty(category);
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
    }

    fn bind_fields<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.label.clone())
            .bind(self.url.clone())
            .bind(self.description.clone())
            .bind(self.icon.clone())
            .bind(self.color.clone())
            .bind(self.category.clone())
            .bind(self.is_active)
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Empty values are accepted and mean "unset".
pub(crate) fn check_choice(
    field: &str,
    value: Option<&str>,
    allowed: &[&str],
) -> Result<(), ApiError> {
    match value {
        Some(v) if !v.is_empty() && !allowed.contains(&v) => Err(ApiError::BadRequest(format!(
            "{} must be one of: {}",
            field,
            allowed.join(", ")
        ))),
        _ => Ok(()),
    }
}
