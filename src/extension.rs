//! Extension manifests.
//!
//! An extension describes itself with a static manifest: identity,
//! version, the host versions it supports, the extensions it requires and
//! the configuration fields the admin settings page renders for it.
//! Manifests use the host's JSON field names (`introduce`, `authorsite`,
//! `adaptation`, `require`, `config`, ...).

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use semver::{Version, VersionReq};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::ManifestError;

/// Input widget for a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Radio,
    Checkbox,
    Select,
    Switch,
}

impl FieldKind {
    /// Radio, checkbox and select pick from an option list.
    pub fn has_options(self) -> bool {
        matches!(self, Self::Radio | Self::Checkbox | Self::Select)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigField {
    /// Field key, unique within the manifest.
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Default value.  Checkbox defaults list option keys separated by commas.
    #[serde(default)]
    pub value: String,
    #[serde(rename = "require", default, deserialize_with = "flag")]
    pub required: bool,
    /// Option value → label, for option-bearing kinds.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, String>,
    #[serde(default)]
    pub description: String,
}

impl ConfigField {
    fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::EmptyFieldKey);
        }
        if !self.kind.has_options() {
            return Ok(());
        }
        if self.options.is_empty() {
            return Err(ManifestError::MissingOptions(self.name.clone()));
        }

        let defaults: Vec<&str> = match self.kind {
            FieldKind::Checkbox => self
                .value
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect(),
            _ if self.value.is_empty() => Vec::new(),
            _ => vec![self.value.as_str()],
        };
        if let Some(bad) = defaults.iter().find(|v| !self.options.contains_key(**v)) {
            return Err(ManifestError::InvalidDefault {
                field: self.name.clone(),
                value: (*bad).to_string(),
            });
        }
        Ok(())
    }
}

/// Static descriptor of an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Identifier, e.g. `Demo`.
    pub name: String,
    /// Display name.
    pub title: String,
    #[serde(rename = "introduce", default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "authorsite", default, skip_serializing_if = "Option::is_none")]
    pub author_site: Option<String>,
    #[serde(rename = "authoremail", default)]
    pub author_email: String,
    pub version: String,
    /// Host version requirement, e.g. `1.0.*`.
    #[serde(default = "any_version")]
    pub adaptation: String,
    /// Required extension name → version requirement.
    #[serde(default)]
    pub require: BTreeMap<String, String>,
    #[serde(default)]
    pub config: Vec<ConfigField>,
}

fn any_version() -> String {
    "*".into()
}

impl ExtensionManifest {
    /// Parse and validate a JSON manifest.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check every manifest invariant.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::EmptyName);
        }
        self.parsed_version()?;
        self.adaptation_req()?;
        for (name, req) in &self.require {
            parse_req(name, req)?;
        }

        let mut seen = HashSet::new();
        for field in &self.config {
            field.validate()?;
            if !seen.insert(field.name.as_str()) {
                return Err(ManifestError::DuplicateField(field.name.clone()));
            }
        }
        Ok(())
    }

    pub fn parsed_version(&self) -> Result<Version, ManifestError> {
        Version::parse(&self.version).map_err(|source| ManifestError::InvalidVersion {
            version: self.version.clone(),
            source,
        })
    }

    fn adaptation_req(&self) -> Result<VersionReq, ManifestError> {
        parse_req(&self.name, &self.adaptation)
    }

    /// Whether this extension supports the given host version.
    pub fn is_compatible_with(&self, host: &Version) -> Result<bool, ManifestError> {
        Ok(self.adaptation_req()?.matches(host))
    }

    pub fn field(&self, name: &str) -> Option<&ConfigField> {
        self.config.iter().find(|f| f.name == name)
    }

    /// Field key → default value, in declaration order.
    pub fn config_defaults(&self) -> Vec<(&str, &str)> {
        self.config
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str()))
            .collect()
    }

    /// The bundled sample extension, with one field of every kind.
    pub fn demo() -> Self {
        let choices = |label: &str| -> IndexMap<String, String> {
            (1..=3)
                .map(|i| (i.to_string(), format!("{label} {i}")))
                .collect()
        };
        let field = |name: &str, title: &str, kind: FieldKind, options| ConfigField {
            name: name.into(),
            title: title.into(),
            kind,
            value: match kind {
                FieldKind::Text => "Text".into(),
                FieldKind::Textarea => "Textarea".into(),
                _ => "1".into(),
            },
            required: true,
            options,
            description: format!("Set the content {}", title.to_lowercase()),
        };

        Self {
            name: "Demo".into(),
            title: "Demo extension".into(),
            description: "Demo extension description".into(),
            author: "deatil".into(),
            author_site: Some("http://github.com/deatil".into()),
            author_email: "deatil@github.com".into(),
            version: "1.0.1".into(),
            adaptation: "1.0.*".into(),
            require: BTreeMap::new(),
            config: vec![
                field("atext", "Text", FieldKind::Text, IndexMap::new()),
                field("atextarea", "Textarea", FieldKind::Textarea, IndexMap::new()),
                field("aradio", "Radio", FieldKind::Radio, choices("Radio")),
                field("acheckbox", "Checkbox", FieldKind::Checkbox, choices("Checkbox")),
                field("aselect", "Select", FieldKind::Select, choices("Select")),
                field("aswitch", "Switch", FieldKind::Switch, IndexMap::new()),
            ],
        }
    }
}

fn parse_req(name: &str, requirement: &str) -> Result<VersionReq, ManifestError> {
    VersionReq::parse(requirement).map_err(|source| ManifestError::InvalidRequirement {
        name: name.to_string(),
        requirement: requirement.to_string(),
        source,
    })
}

/// Hosts write required flags as `"1"` / `"0"`, numbers or booleans.
fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    Ok(match Flag::deserialize(d)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Str(s) => matches!(s.trim(), "1" | "true" | "yes"),
    })
}

/// A `require` entry that the registry cannot satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmetRequirement {
    pub name: String,
    pub requirement: String,
    /// Registered version, if the extension is present at all.
    pub installed: Option<String>,
}

/// Registered extensions, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    extensions: BTreeMap<String, ExtensionManifest>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a manifest.  Names are unique.
    pub fn register(&mut self, manifest: ExtensionManifest) -> Result<(), ManifestError> {
        manifest.validate()?;
        if self.extensions.contains_key(&manifest.name) {
            return Err(ManifestError::AlreadyRegistered(manifest.name));
        }
        debug!(extension = %manifest.name, version = %manifest.version, "registered extension");
        self.extensions.insert(manifest.name.clone(), manifest);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ExtensionManifest> {
        self.extensions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtensionManifest> {
        self.extensions.values()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// `require` entries of `name` that are absent or at a non-matching
    /// version.
    pub fn unmet_requirements(&self, name: &str) -> Result<Vec<UnmetRequirement>, ManifestError> {
        let manifest = self
            .get(name)
            .ok_or_else(|| ManifestError::NotRegistered(name.to_string()))?;

        let mut unmet = Vec::new();
        for (dep, requirement) in &manifest.require {
            let req = parse_req(dep, requirement)?;
            let installed = self.get(dep);
            let satisfied = match installed {
                Some(m) => req.matches(&m.parsed_version()?),
                None => false,
            };
            if !satisfied {
                unmet.push(UnmetRequirement {
                    name: dep.clone(),
                    requirement: requirement.clone(),
                    installed: installed.map(|m| m.version.clone()),
                });
            }
        }
        Ok(unmet)
    }
}
