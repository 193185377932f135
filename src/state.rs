//! Per-chapter transformation record.
//!
//! The displayed content is never stored: it is derived from the axis
//! statuses and the cached variants every time it is asked for.

use std::fmt;

/// One of the two transformation kinds tracked per chapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Personalization,
    Translation,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::Personalization => Axis::Translation,
            Axis::Translation => Axis::Personalization,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Personalization => f.write_str("personalization"),
            Axis::Translation => f.write_str("translation"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AxisStatus {
    #[default]
    Idle,
    Pending,
    Active,
    Failed,
}

/// Which content variant is on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    Original,
    Personalized,
    Translated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformState {
    chapter_id: String,
    original: String,
    personalized: Option<String>,
    translated: Option<String>,
    personalization: AxisStatus,
    translation: AxisStatus,
    last_error: Option<String>,
    // Active axis that most recently overwrote the display.
    front: Option<Axis>,
    ticket: u64,
}

impl TransformState {
    pub fn new(chapter_id: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            original: original.into(),
            personalized: None,
            translated: None,
            personalization: AxisStatus::Idle,
            translation: AxisStatus::Idle,
            last_error: None,
            front: None,
            ticket: 0,
        }
    }

    pub fn chapter_id(&self) -> &str {
        &self.chapter_id
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn cached(&self, axis: Axis) -> Option<&str> {
        match axis {
            Axis::Personalization => self.personalized.as_deref(),
            Axis::Translation => self.translated.as_deref(),
        }
    }

    pub fn status(&self, axis: Axis) -> AxisStatus {
        match axis {
            Axis::Personalization => self.personalization,
            Axis::Translation => self.translation,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Tag carried by in-flight requests; a completion whose ticket no
    /// longer matches belongs to a state this record has moved past.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn pending_axis(&self) -> Option<Axis> {
        [Axis::Personalization, Axis::Translation]
            .into_iter()
            .find(|axis| self.status(*axis) == AxisStatus::Pending)
    }

    pub fn is_active(&self, axis: Axis) -> bool {
        self.status(axis) == AxisStatus::Active
    }

    pub fn variant(&self) -> Variant {
        let shown = |axis: Axis| self.is_active(axis) && self.cached(axis).is_some();
        let axis = match self.front {
            Some(front) if shown(front) => Some(front),
            Some(front) if shown(front.other()) => Some(front.other()),
            None if shown(Axis::Translation) => Some(Axis::Translation),
            None if shown(Axis::Personalization) => Some(Axis::Personalization),
            _ => None,
        };
        match axis {
            Some(Axis::Personalization) => Variant::Personalized,
            Some(Axis::Translation) => Variant::Translated,
            None => Variant::Original,
        }
    }

    pub fn displayed(&self) -> &str {
        match self.variant() {
            Variant::Personalized => self.personalized.as_deref().unwrap_or(&self.original),
            Variant::Translated => self.translated.as_deref().unwrap_or(&self.original),
            Variant::Original => &self.original,
        }
    }

    /// Right-to-left exactly while the translation axis is Active.
    pub fn is_rtl(&self) -> bool {
        self.is_active(Axis::Translation)
    }

    /// Marks `axis` in flight and clears the previous error.
    pub(crate) fn begin(&mut self, axis: Axis) {
        self.set_status(axis, AxisStatus::Pending);
        self.last_error = None;
    }

    pub(crate) fn activate(&mut self, axis: Axis, content: String) {
        match axis {
            Axis::Personalization => self.personalized = Some(content),
            Axis::Translation => self.translated = Some(content),
        }
        self.set_status(axis, AxisStatus::Active);
        self.front = Some(axis);
    }

    pub(crate) fn fail(&mut self, axis: Axis, message: String) {
        self.set_status(axis, AxisStatus::Failed);
        self.last_error = Some(message);
    }

    /// Returns `axis` to Idle; its cached content is kept.
    pub(crate) fn deactivate(&mut self, axis: Axis) {
        self.set_status(axis, AxisStatus::Idle);
        if self.front == Some(axis) {
            self.front = None;
        }
    }

    /// Drops an in-flight request on `axis` without recording a failure.
    pub(crate) fn abandon(&mut self, axis: Axis) {
        self.deactivate(axis);
        self.ticket += 1;
    }

    pub(crate) fn revert_all(&mut self) {
        self.personalization = AxisStatus::Idle;
        self.translation = AxisStatus::Idle;
        self.front = None;
        self.last_error = None;
        self.ticket += 1;
    }

    pub(crate) fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Starts over for a (possibly different) chapter. The ticket keeps
    /// counting so responses for the previous chapter are recognised as stale.
    pub(crate) fn reset(&mut self, chapter_id: String, original: String) {
        let ticket = self.ticket + 1;
        *self = TransformState::new(chapter_id, original);
        self.ticket = ticket;
    }

    pub(crate) fn retire(&mut self) {
        self.ticket += 1;
    }

    fn set_status(&mut self, axis: Axis, status: AxisStatus) {
        match axis {
            Axis::Personalization => self.personalization = status,
            Axis::Translation => self.translation = status,
        }
    }
}
