//! Field descriptors, validators and choice lists used by wizard steps.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

/// Separator used for multi-choice input and display.
pub const LIST_SEPARATOR: char = ',';

/// Recoverable input problem. Blocks a transition; never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn required(label: &str) -> Self {
        Self::new(format!("{} is required", label))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Date,
    Boolean,
    Choice(Vec<String>),
    MultiChoice(Vec<String>),
    /// Holds a data URI produced by a file read or a camera capture.
    Attachment,
}

type ValidatorCallback = dyn Fn(&str) -> Result<String, String> + Send + Sync;
type SharedValidatorCallback = Arc<ValidatorCallback>;

/// Normalises raw input. The returned string is what gets bound to the draft.
#[derive(Clone)]
pub enum Validator {
    None,
    NonEmpty,
    Integer,
    PositiveNumber,
    Decimal,
    Date,
    Email,
    OneOf(Vec<String>),
    Custom(SharedValidatorCallback),
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::None => write!(f, "None"),
            Validator::NonEmpty => write!(f, "NonEmpty"),
            Validator::Integer => write!(f, "Integer"),
            Validator::PositiveNumber => write!(f, "PositiveNumber"),
            Validator::Decimal => write!(f, "Decimal"),
            Validator::Date => write!(f, "Date"),
            Validator::Email => write!(f, "Email"),
            Validator::OneOf(options) => f.debug_tuple("OneOf").field(options).finish(),
            Validator::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Validator {
    pub fn validate(&self, input: &str) -> Result<String, ValidationError> {
        let trimmed = input.trim();
        match self {
            Validator::None => Ok(trimmed.to_string()),
            Validator::NonEmpty => {
                if trimmed.is_empty() {
                    Err(ValidationError::new("Value cannot be empty"))
                } else {
                    Ok(trimmed.to_string())
                }
            }
            Validator::Integer => trimmed
                .parse::<i64>()
                .map(|v| v.to_string())
                .map_err(|_| ValidationError::new("Enter a whole number (e.g., 3)")),
            Validator::PositiveNumber => parse_decimal(trimmed)
                .ok_or_else(|| ValidationError::new("Enter a numeric value"))
                .and_then(|v| {
                    if v > 0.0 {
                        Ok(format_amount(v))
                    } else {
                        Err(ValidationError::new("Value must be greater than zero"))
                    }
                }),
            Validator::Decimal => parse_decimal(trimmed)
                .map(format_amount)
                .ok_or_else(|| ValidationError::new("Enter a numeric value")),
            Validator::Date => parse_date(trimmed)
                .map(|d| d.to_string())
                .ok_or_else(|| ValidationError::new("Use YYYY-MM-DD or DD.MM.YYYY format")),
            Validator::Email => {
                let valid = trimmed
                    .split_once('@')
                    .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
                    .unwrap_or(false);
                if valid && !trimmed.contains(char::is_whitespace) {
                    Ok(trimmed.to_ascii_lowercase())
                } else {
                    Err(ValidationError::new("Enter a valid email address"))
                }
            }
            Validator::OneOf(options) => {
                let normalized = trimmed.to_lowercase();
                options
                    .iter()
                    .find(|candidate| candidate.to_lowercase() == normalized)
                    .cloned()
                    .ok_or_else(|| {
                        ValidationError::new(format!(
                            "Value must be one of: {}",
                            options.join(", ")
                        ))
                    })
            }
            Validator::Custom(func) => func(input).map_err(ValidationError::new),
        }
    }
}

/// Declarative description of one input on a step.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub help: Option<&'static str>,
    pub validator: Validator,
}

impl FieldDescriptor {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        kind: FieldKind,
        validator: Validator,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            required: true,
            help: None,
            validator,
        }
    }

    pub fn with_optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    /// Validates raw input against the field kind and validator.
    ///
    /// Blank input on an optional field normalises to an empty string, which
    /// bindings treat as "clear".
    pub fn validate(&self, raw: &str) -> Result<String, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return if self.required {
                Err(ValidationError::required(&self.label))
            } else {
                Ok(String::new())
            };
        }

        match (&self.kind, &self.validator) {
            (FieldKind::Boolean, Validator::None) => parse_bool(trimmed)
                .map(|value| value.to_string())
                .ok_or_else(|| ValidationError::new("Answer yes or no")),
            (FieldKind::Choice(options), Validator::None) => {
                Validator::OneOf(options.clone()).validate(trimmed)
            }
            (FieldKind::Integer, Validator::None) => Validator::Integer.validate(trimmed),
            (FieldKind::Decimal, Validator::None) => Validator::Decimal.validate(trimmed),
            (FieldKind::Date, Validator::None) => Validator::Date.validate(trimmed),
            (_, validator) => validator.validate(raw),
        }
    }
}

/// Presents menu-style choices while accepting either the label, the
/// numbered display label, or the bare index as input.
#[derive(Debug, Clone)]
pub struct ChoiceMapper<T: Clone + PartialEq + Send + Sync> {
    display: Vec<String>,
    values: Vec<T>,
    alias_to_index: HashMap<String, usize>,
}

impl<T: Clone + PartialEq + Send + Sync> ChoiceMapper<T> {
    pub fn from_pairs(pairs: Vec<(String, T)>) -> Self {
        let mut display = Vec::new();
        let mut values = Vec::new();
        let mut alias_to_index = HashMap::new();

        for (idx, (label, value)) in pairs.into_iter().enumerate() {
            let index = idx + 1;
            let display_label = format!("[{}] {}", index, label);
            alias_to_index.insert(index.to_string(), idx);
            alias_to_index.entry(alias_key(&label)).or_insert(idx);
            alias_to_index.insert(alias_key(&display_label), idx);
            display.push(display_label);
            values.push(value);
        }

        Self {
            display,
            values,
            alias_to_index,
        }
    }

    pub fn options(&self) -> Vec<String> {
        self.display.clone()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn index_of(&self, input: &str) -> Option<usize> {
        self.alias_to_index.get(&alias_key(input)).copied()
    }

    pub fn resolve(&self, input: &str) -> Option<String> {
        self.index_of(input).map(|index| self.display[index].clone())
    }

    pub fn value_for(&self, input: &str) -> Option<&T> {
        self.index_of(input).and_then(|index| self.values.get(index))
    }

    pub fn display_for_value(&self, value: &T) -> Option<String> {
        self.values
            .iter()
            .position(|candidate| candidate == value)
            .map(|index| self.display[index].clone())
    }

    /// Splits a list answer into choice indices. Labels that themselves
    /// contain the separator are matched whole, longest match first; a piece
    /// that matches nothing comes back as `Err` with its text.
    pub fn entries<'a>(&self, input: &'a str) -> Vec<Result<usize, &'a str>> {
        let pieces: Vec<&str> = input.split(LIST_SEPARATOR).collect();
        let mut entries = Vec::new();
        let mut start = 0;
        while start < pieces.len() {
            if pieces[start].trim().is_empty() {
                start += 1;
                continue;
            }
            let matched = (start + 1..=pieces.len()).rev().find_map(|end| {
                let candidate = pieces[start..end].join(&LIST_SEPARATOR.to_string());
                self.index_of(&candidate).map(|index| (index, end))
            });
            match matched {
                Some((index, end)) => {
                    entries.push(Ok(index));
                    start = end;
                }
                None => {
                    entries.push(Err(pieces[start].trim()));
                    start += 1;
                }
            }
        }
        entries
    }

    /// Resolves a separator-joined list of choices; unknown entries are skipped.
    pub fn values_for_list(&self, input: &str) -> Vec<T> {
        self.entries(input)
            .into_iter()
            .filter_map(Result::ok)
            .filter_map(|index| self.values.get(index).cloned())
            .collect()
    }

    pub fn display_for_values<'a>(&self, values: impl IntoIterator<Item = &'a T>) -> Option<String>
    where
        T: 'a,
    {
        let labels: Vec<String> = values
            .into_iter()
            .filter_map(|value| self.display_for_value(value))
            .collect();
        if labels.is_empty() {
            None
        } else {
            Some(labels.join(&format!("{} ", LIST_SEPARATOR)))
        }
    }
}

/// Lookup form of a label: lower case, no spaces around separators.
fn alias_key(text: &str) -> String {
    text.split(LIST_SEPARATOR)
        .map(|part| part.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

pub fn make_choice_validator<T: Clone + PartialEq + Send + Sync + 'static>(
    mapper: &ChoiceMapper<T>,
    field_label: &str,
) -> Validator {
    let options = mapper.options();
    let lookup = mapper.clone();
    let field_label = field_label.to_string();
    Validator::Custom(Arc::new(move |input| {
        lookup.resolve(input).ok_or_else(|| {
            format!(
                "Select a valid {} (options: {})",
                field_label,
                options.join(", ")
            )
        })
    }))
}

/// Accepts a comma-separated list. Every entry must resolve.
pub fn make_multi_choice_validator<T: Clone + PartialEq + Send + Sync + 'static>(
    mapper: &ChoiceMapper<T>,
    field_label: &str,
) -> Validator {
    let lookup = mapper.clone();
    let field_label = field_label.to_string();
    Validator::Custom(Arc::new(move |input| {
        let mut resolved = Vec::new();
        for entry in lookup.entries(input) {
            match entry {
                Ok(index) => {
                    let display = lookup.display[index].clone();
                    if !resolved.contains(&display) {
                        resolved.push(display);
                    }
                }
                Err(unknown) => return Err(format!("Unknown {}: `{}`", field_label, unknown)),
            }
        }
        Ok(resolved.join(&format!("{} ", LIST_SEPARATOR)))
    }))
}

pub fn make_max_length_validator(max_len: usize) -> Validator {
    Validator::Custom(Arc::new(move |input| {
        let trimmed = input.trim();
        if trimmed.chars().count() > max_len {
            Err(format!("Keep it under {} characters", max_len))
        } else {
            Ok(trimmed.to_string())
        }
    }))
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "y" | "yes" | "ja" | "true" | "1" => Some(true),
        "n" | "no" | "nein" | "false" | "0" => Some(false),
        _ => None,
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d.%m.%Y"))
        .ok()
}

pub fn parse_decimal(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace('\'', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub fn format_amount(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Trimmed value, or `None` when blank.
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn optional_fields_accept_blank_input() {
        let field = FieldDescriptor::new("phone", "Phone", FieldKind::Text, Validator::None)
            .with_optional();
        assert_eq!(field.validate("   ").unwrap(), "");

        let required = FieldDescriptor::new("name", "Name", FieldKind::Text, Validator::NonEmpty);
        assert_eq!(
            required.validate("").unwrap_err().message,
            "Name is required"
        );
    }

    #[test]
    fn kind_defaults_apply_without_explicit_validator() {
        let date = FieldDescriptor::new("birth", "Birth date", FieldKind::Date, Validator::None);
        assert_eq!(date.validate("03.04.2011").unwrap(), "2011-04-03");
        assert!(date.validate("2011-13-01").is_err());

        let flag = FieldDescriptor::new("self", "For me", FieldKind::Boolean, Validator::None);
        assert_eq!(flag.validate("Ja").unwrap(), "true");
        assert!(flag.validate("maybe").is_err());
    }

    #[test]
    fn amounts_accept_swiss_thousands_separator() {
        assert_eq!(
            Validator::PositiveNumber.validate("1'250.5").unwrap(),
            "1250.50"
        );
        assert!(Validator::PositiveNumber.validate("0").is_err());
    }

    #[test]
    fn email_validator_normalises_case() {
        assert_eq!(
            Validator::Email.validate(" Lea.Meier@Example.org ").unwrap(),
            "lea.meier@example.org"
        );
        assert!(Validator::Email.validate("lea@localhost").is_err());
    }

    #[test]
    fn choice_mapper_resolves_index_label_and_display() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mapper = ChoiceMapper::from_pairs(vec![
            ("Herren 1".to_string(), a),
            ("Damen".to_string(), b),
        ]);
        assert_eq!(mapper.value_for("2"), Some(&b));
        assert_eq!(mapper.value_for("herren 1"), Some(&a));
        assert_eq!(mapper.value_for("[2] Damen"), Some(&b));
        assert_eq!(mapper.display_for_value(&a).as_deref(), Some("[1] Herren 1"));
        assert_eq!(mapper.values_for_list("2, 1, unknown"), vec![b, a]);
    }

    #[test]
    fn multi_choice_validator_rejects_unknown_entries() {
        let mapper = ChoiceMapper::from_pairs(vec![
            ("Spieler".to_string(), 1),
            ("Trainer".to_string(), 2),
        ]);
        let validator = make_multi_choice_validator(&mapper, "role");
        assert_eq!(
            validator.validate("1, trainer, 1").unwrap(),
            "[1] Spieler, [2] Trainer"
        );
        assert!(validator
            .validate("Spieler, Kassier")
            .unwrap_err()
            .message
            .contains("Kassier"));
    }

    #[test]
    fn labels_containing_the_separator_stay_whole() {
        let mapper = ChoiceMapper::from_pairs(vec![
            ("Senioren, 30+".to_string(), 1),
            ("Junioren".to_string(), 2),
        ]);
        assert_eq!(mapper.values_for_list("Senioren, 30+, Junioren"), vec![1, 2]);
        assert_eq!(mapper.values_for_list("junioren,senioren,30+"), vec![2, 1]);

        let shown = mapper.display_for_values(&[1, 2]).unwrap();
        assert_eq!(shown, "[1] Senioren, 30+, [2] Junioren");
        assert_eq!(mapper.values_for_list(&shown), vec![1, 2]);

        let validator = make_multi_choice_validator(&mapper, "team");
        assert_eq!(validator.validate(&shown).unwrap(), shown);
        assert!(validator
            .validate("Senioren, 40+")
            .unwrap_err()
            .message
            .contains("Senioren"));
    }
}
