//! Context properties and per-registration options.

use bitflags::bitflags;
use metabridge_core::MethodKind;
use rustc_hash::FxHashSet;

/// Tunable context-wide properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextProperty {
    /// Non-zero: `add_type` rejects classes without constructors.
    CheckConstructors,
    /// Maximum parameter count of any wrapped constructor or method.
    MaxGenericArguments,
    /// Non-zero: generated types are named `namespace.Class`.
    QualifiedTypeNames,
}

impl ContextProperty {
    pub fn default_value(&self) -> usize {
        match self {
            ContextProperty::CheckConstructors => 1,
            ContextProperty::MaxGenericArguments => 10,
            ContextProperty::QualifiedTypeNames => 1,
        }
    }
}

bitflags! {
    /// Member kinds exposed on a generated wrapper type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemberKinds: u8 {
        const SLOT = 1 << 0;
        const SIGNAL = 1 << 1;
        const INVOKABLE = 1 << 2;
    }
}

impl MemberKinds {
    pub fn contains_kind(self, kind: MethodKind) -> bool {
        self.contains(Self::from(kind))
    }
}

impl From<MethodKind> for MemberKinds {
    fn from(kind: MethodKind) -> Self {
        match kind {
            MethodKind::Slot => MemberKinds::SLOT,
            MethodKind::Signal => MemberKinds::SIGNAL,
            MethodKind::Invokable => MemberKinds::INVOKABLE,
        }
    }
}

impl Default for MemberKinds {
    fn default() -> Self {
        MemberKinds::all()
    }
}

/// Options for a single type registration.
#[derive(Debug, Clone, Default)]
pub struct TypeOptions {
    /// Overrides [`ContextProperty::CheckConstructors`] when set.
    pub check_constructor: Option<bool>,
    /// Script-visible name; defaults to the native class name.
    pub class_name: Option<String>,
    pub doc: Option<String>,
    /// Restrict exposed members to these names.
    pub selected_members: Option<FxHashSet<String>>,
    pub kinds: MemberKinds,
}

impl TypeOptions {
    /// Options that skip the constructor check, used for classes of
    /// objects created natively.
    pub fn unchecked() -> Self {
        Self {
            check_constructor: Some(false),
            ..Self::default()
        }
    }

    pub fn with_class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_members<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_members = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_kinds(mut self, kinds: MemberKinds) -> Self {
        self.kinds = kinds;
        self
    }

    /// Check if a member passes the name and kind filters.
    pub fn exposes(&self, name: &str, kind: MethodKind) -> bool {
        self.kinds.contains_kind(kind)
            && self
                .selected_members
                .as_ref()
                .is_none_or(|names| names.contains(name))
    }
}
