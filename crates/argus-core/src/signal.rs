//! Subject signals and the signal extractor.
//!
//! Raw subject input (whatever partial data an operator has about a person)
//! is turned into a [`SignalSet`]: typed, normalized values with a presence
//! flag. A supplied-but-unusable value (e.g. `"bob at example"` as an email)
//! is kept with `presence == false` so callers can see it was rejected.
//! Extraction performs no I/O.

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::Category;
use crate::enums::{Attribute, Confidence, DataType, EntityType, SignalKind};

// Patterns are literals; `None` would only mean a typo here and disables mining.
static EMAIL_IN_TEXT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").ok());

static PHONE_IN_TEXT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s().-]{5,}\d").ok());

static HANDLE_IN_TEXT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s(])@([A-Za-z0-9_]{2,30})\b").ok());

/// A typed datum extracted from subject input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Signal {
    pub kind: SignalKind,
    /// Normalized value (trimmed, canonical casing, formatting stripped).
    pub value: String,
    /// Whether the value is usable for querying.
    pub presence: bool,
    #[serde(default)]
    pub confidence: Confidence,
}

impl Signal {
    #[must_use]
    pub fn present(kind: SignalKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            presence: true,
            confidence: Confidence::High,
        }
    }

    #[must_use]
    pub fn absent(kind: SignalKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            presence: false,
            confidence: Confidence::Low,
        }
    }

    #[must_use]
    pub const fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}

impl SignalKind {
    /// The category a source would carry if it were a perfect fit for this
    /// signal. Selection counts how many tiers of a source's category agree
    /// with this profile.
    #[must_use]
    pub const fn profile(self) -> Category {
        let (data_type, entity_type, attribute) = match self {
            Self::Name => (DataType::Text, EntityType::Person, Attribute::Name),
            Self::Phone => (DataType::Text, EntityType::Person, Attribute::Phone),
            Self::Email => (DataType::Text, EntityType::Person, Attribute::Email),
            Self::Handle => (DataType::Text, EntityType::Person, Attribute::Username),
            Self::Location => (DataType::Location, EntityType::Address, Attribute::Coordinates),
            Self::Vehicle => (DataType::Text, EntityType::Vehicle, Attribute::LicensePlate),
            Self::FreeText => (DataType::Text, EntityType::Person, Attribute::Text),
            Self::Image => (DataType::Image, EntityType::Person, Attribute::Face),
        };
        Category {
            data_type,
            entity_type,
            attribute,
        }
    }
}

/// Raw, partial subject data as supplied by an operator.
///
/// Every field is optional; any combination is a valid investigation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubjectInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Social media handles, comma or whitespace separated.
    #[serde(default)]
    pub handles: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub vehicle: Option<String>,
    /// Free-form notes. Emails, phone numbers and `@handles` found here are
    /// mined into additional low-confidence signals.
    #[serde(default)]
    pub notes: Option<String>,
    /// Reference to an uploaded image (path, URL, or content hash).
    #[serde(default)]
    pub image: Option<String>,
}

impl SubjectInput {
    /// Whether no field carries any non-blank text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [
            &self.name,
            &self.phone,
            &self.email,
            &self.handles,
            &self.location,
            &self.vehicle,
            &self.notes,
            &self.image,
        ]
        .iter()
        .all(|field| field.as_deref().is_none_or(|v| v.trim().is_empty()))
    }

    /// Extract typed signals from this input.
    #[must_use]
    pub fn extract(&self) -> SignalSet {
        let mut set = SignalSet::default();

        if let Some(raw) = self.name.as_deref() {
            set.push(text_signal(SignalKind::Name, raw));
        }
        if let Some(raw) = self.phone.as_deref() {
            set.push(phone_signal(raw));
        }
        if let Some(raw) = self.email.as_deref() {
            set.push(email_signal(raw));
        }
        if let Some(raw) = self.handles.as_deref() {
            for handle in raw
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|h| !h.is_empty())
            {
                set.push(handle_signal(handle));
            }
        }
        if let Some(raw) = self.location.as_deref() {
            set.push(text_signal(SignalKind::Location, raw));
        }
        if let Some(raw) = self.vehicle.as_deref() {
            set.push(vehicle_signal(raw));
        }
        if let Some(raw) = self.notes.as_deref() {
            set.push(text_signal(SignalKind::FreeText, raw));
            for mined in mine_free_text(raw) {
                set.push(mined);
            }
        }
        if let Some(raw) = self.image.as_deref() {
            let reference = raw.trim();
            set.push(if reference.is_empty() {
                Signal::absent(SignalKind::Image, "")
            } else {
                Signal::present(SignalKind::Image, reference)
            });
        }

        tracing::debug!(
            total = set.len(),
            present = set.present().count(),
            "extracted subject signals"
        );
        set
    }
}

/// Ordered, duplicate-free collection of signals for one investigation.
///
/// Order is extraction order; selection uses it as its last tie-break.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SignalSet {
    signals: Vec<Signal>,
}

impl SignalSet {
    #[must_use]
    pub fn new(signals: Vec<Signal>) -> Self {
        let mut set = Self::default();
        for signal in signals {
            set.push(signal);
        }
        set
    }

    /// Append a signal unless one with the same kind and value exists.
    ///
    /// A present duplicate replaces an absent one with the same value.
    pub fn push(&mut self, signal: Signal) {
        if let Some(existing) = self
            .signals
            .iter_mut()
            .find(|s| s.kind == signal.kind && s.value == signal.value)
        {
            if !existing.presence && signal.presence {
                *existing = signal;
            }
            return;
        }
        self.signals.push(signal);
    }

    /// Iterate over usable signals in extraction order.
    pub fn present(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.presence)
    }

    /// First usable signal of the given kind.
    #[must_use]
    pub fn first_present(&self, kind: SignalKind) -> Option<&Signal> {
        self.present().find(|s| s.kind == kind)
    }

    #[must_use]
    pub fn has_present(&self, kind: SignalKind) -> bool {
        self.first_present(kind).is_some()
    }

    #[must_use]
    pub fn all(&self) -> &[Signal] {
        &self.signals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_signal(kind: SignalKind, raw: &str) -> Signal {
    let value = collapse_whitespace(raw);
    if value.is_empty() {
        Signal::absent(kind, value)
    } else {
        Signal::present(kind, value)
    }
}

fn phone_signal(raw: &str) -> Signal {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    let value = if trimmed.starts_with('+') {
        format!("+{digits}")
    } else {
        digits.clone()
    };
    // E.164 allows at most 15 digits; anything under 7 is not dialable.
    if (7..=15).contains(&digits.len()) {
        Signal::present(SignalKind::Phone, value)
    } else {
        Signal::absent(SignalKind::Phone, value)
    }
}

fn is_valid_email(value: &str) -> bool {
    let mut parts = value.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

fn email_signal(raw: &str) -> Signal {
    let value = raw.trim().to_ascii_lowercase();
    if is_valid_email(&value) {
        Signal::present(SignalKind::Email, value)
    } else {
        Signal::absent(SignalKind::Email, value)
    }
}

fn handle_signal(raw: &str) -> Signal {
    let value = raw.trim().trim_start_matches('@').to_string();
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Signal::present(SignalKind::Handle, value)
    } else {
        Signal::absent(SignalKind::Handle, value)
    }
}

fn vehicle_signal(raw: &str) -> Signal {
    let value = collapse_whitespace(raw).to_ascii_uppercase();
    if value.is_empty() {
        Signal::absent(SignalKind::Vehicle, value)
    } else {
        Signal::present(SignalKind::Vehicle, value)
    }
}

/// Pull emails, phone numbers and `@handles` out of free text.
fn mine_free_text(text: &str) -> Vec<Signal> {
    let mut mined = Vec::new();

    if let Some(re) = EMAIL_IN_TEXT.as_ref() {
        for m in re.find_iter(text) {
            let signal = email_signal(m.as_str());
            if signal.presence {
                mined.push(signal.with_confidence(Confidence::Low));
            }
        }
    }

    if let Some(re) = PHONE_IN_TEXT.as_ref() {
        for m in re.find_iter(text) {
            let signal = phone_signal(m.as_str());
            if signal.presence {
                mined.push(signal.with_confidence(Confidence::Low));
            }
        }
    }

    if let Some(re) = HANDLE_IN_TEXT.as_ref() {
        for handle in re.captures_iter(text).filter_map(|caps| caps.get(1)) {
            let signal = handle_signal(handle.as_str());
            if signal.presence {
                mined.push(signal.with_confidence(Confidence::Low));
            }
        }
    }

    mined
}
