// Command definition models and their canonical form.
//
// The serde shape of `CommandDefinition` is the platform's application-command
// JSON, so a definition can be sent to the remote API as-is. The canonical
// form (sorted keys, compact, defaults omitted) is what gets hashed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Which surface a command lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CommandKind {
    #[default]
    ChatInput,
    User,
    Message,
}

impl From<CommandKind> for u8 {
    fn from(kind: CommandKind) -> Self {
        match kind {
            CommandKind::ChatInput => 1,
            CommandKind::User => 2,
            CommandKind::Message => 3,
        }
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CommandKind::ChatInput),
            2 => Ok(CommandKind::User),
            3 => Ok(CommandKind::Message),
            other => Err(format!("unknown command type {other}")),
        }
    }
}

impl CommandKind {
    fn is_chat_input(&self) -> bool {
        matches!(self, CommandKind::ChatInput)
    }
}

/// Option types as numbered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OptionKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl From<OptionKind> for u8 {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::SubCommand => 1,
            OptionKind::SubCommandGroup => 2,
            OptionKind::String => 3,
            OptionKind::Integer => 4,
            OptionKind::Boolean => 5,
            OptionKind::User => 6,
            OptionKind::Channel => 7,
            OptionKind::Role => 8,
            OptionKind::Mentionable => 9,
            OptionKind::Number => 10,
            OptionKind::Attachment => 11,
        }
    }
}

impl TryFrom<u8> for OptionKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => OptionKind::SubCommand,
            2 => OptionKind::SubCommandGroup,
            3 => OptionKind::String,
            4 => OptionKind::Integer,
            5 => OptionKind::Boolean,
            6 => OptionKind::User,
            7 => OptionKind::Channel,
            8 => OptionKind::Role,
            9 => OptionKind::Mentionable,
            10 => OptionKind::Number,
            11 => OptionKind::Attachment,
            other => return Err(format!("unknown option type {other}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: Value,
}

/// One parameter (or subcommand) in a command's option schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    /// Nested options; only meaningful for subcommands and groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_types: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
}

impl CommandOption {
    pub fn new(kind: OptionKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            autocomplete: false,
            choices: Vec::new(),
            options: Vec::new(),
            channel_types: Vec::new(),
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[cfg(test)]
    pub fn choice(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.choices.push(OptionChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    #[cfg(test)]
    pub fn sub_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }
}

/// A locally declared command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    /// Permission bitset as a decimal string, the way the platform encodes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nsfw: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: CommandKind::ChatInput,
            options: Vec::new(),
            default_member_permissions: None,
            nsfw: false,
        }
    }

    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn default_member_permissions(mut self, permissions: u64) -> Self {
        self.default_member_permissions = Some(permissions.to_string());
        self
    }

    /// Name of the first required field that is missing, if any.
    ///
    /// Context-menu commands carry no description on the platform, so only
    /// chat-input commands need one.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            return Some("name");
        }
        if self.kind.is_chat_input() && self.description.trim().is_empty() {
            return Some("description");
        }
        None
    }

    /// Checks the definition against the platform's naming and size limits.
    pub fn validate(&self) -> Result<(), String> {
        if self.kind.is_chat_input() {
            check_slash_name(&self.name)?;
            check_description(&self.name, &self.description)?;
        } else {
            let len = self.name.chars().count();
            if len > MAX_NAME_LEN {
                return Err(format!(
                    "name `{}` is {len} characters, at most {MAX_NAME_LEN} are allowed",
                    self.name
                ));
            }
            if !self.description.is_empty() {
                return Err(format!(
                    "context menu command `{}` cannot have a description",
                    self.name
                ));
            }
            if !self.options.is_empty() {
                return Err(format!(
                    "context menu command `{}` cannot have options",
                    self.name
                ));
            }
        }
        self.validate_options()
    }

    fn validate_options(&self) -> Result<(), String> {
        fn walk(options: &[CommandOption], path: &str) -> Result<(), String> {
            if options.len() > MAX_OPTIONS {
                return Err(format!(
                    "`{path}` has {} options, at most {MAX_OPTIONS} are allowed",
                    options.len()
                ));
            }
            for option in options {
                if option.name.trim().is_empty() {
                    return Err(format!("option under `{path}` has no name"));
                }
                let full = format!("{path} {}", option.name);
                check_slash_name(&option.name).map_err(|e| format!("option `{full}`: {e}"))?;
                if option.description.trim().is_empty() {
                    return Err(format!("option `{full}` has no description"));
                }
                check_description(&full, &option.description)?;

                if option.choices.len() > MAX_CHOICES {
                    return Err(format!(
                        "option `{full}` has {} choices, at most {MAX_CHOICES} are allowed",
                        option.choices.len()
                    ));
                }
                for choice in &option.choices {
                    let len = choice.name.chars().count();
                    if len == 0 || len > MAX_DESCRIPTION_LEN {
                        return Err(format!(
                            "choice `{}` of `{full}` must be 1-{MAX_DESCRIPTION_LEN} characters",
                            choice.name
                        ));
                    }
                }

                let nested = !option.options.is_empty();
                let is_group = matches!(
                    option.kind,
                    OptionKind::SubCommand | OptionKind::SubCommandGroup
                );
                if nested && !is_group {
                    return Err(format!(
                        "option `{full}` has nested options but is not a subcommand"
                    ));
                }
                walk(&option.options, &full)?;
            }
            Ok(())
        }

        walk(&self.options, &self.name)
    }
}

const MAX_NAME_LEN: usize = 32;
const MAX_DESCRIPTION_LEN: usize = 100;
const MAX_OPTIONS: usize = 25;
const MAX_CHOICES: usize = 25;

/// Chat-input and option names: 1-32 lowercase letters, digits, `-` or `_`.
fn check_slash_name(name: &str) -> Result<(), String> {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(format!(
            "name `{name}` is {len} characters, must be 1-{MAX_NAME_LEN}"
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(format!("name `{name}` contains {bad:?}"));
    }
    if name.chars().any(char::is_uppercase) {
        return Err(format!("name `{name}` must be lowercase"));
    }
    Ok(())
}

fn check_description(owner: &str, description: &str) -> Result<(), String> {
    let len = description.chars().count();
    if len == 0 || len > MAX_DESCRIPTION_LEN {
        return Err(format!(
            "description of `{owner}` is {len} characters, must be 1-{MAX_DESCRIPTION_LEN}"
        ));
    }
    Ok(())
}

// ============================================================================
// CANONICAL FORM & CONTENT HASH
// ============================================================================

/// Deterministic bytes for a definition: compact JSON, object keys sorted at
/// every depth, array order kept.
pub fn canonicalize(definition: &CommandDefinition) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(definition)?;
    let mut out = Vec::with_capacity(256);
    write_canonical(&value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(item, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        // Integral floats are written as integers: `1.0` and `1` hash alike.
        Value::Number(number) => match number.as_f64() {
            Some(f)
                if number.is_f64()
                    && f.fract() == 0.0
                    && f >= i64::MIN as f64
                    && f < i64::MAX as f64 =>
            {
                serde_json::to_writer(&mut *out, &(f as i64))?
            }
            _ => serde_json::to_writer(&mut *out, number)?,
        },
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}

/// Hex sha256 of the canonical form.
pub fn content_hash(definition: &CommandDefinition) -> Result<String, serde_json::Error> {
    let bytes = canonicalize(definition)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
