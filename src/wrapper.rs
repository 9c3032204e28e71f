//! Generated wrapper types and wrapper instances.

use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};

use metabridge_core::{ClassId, MetaObject, MethodKind, NativeObjectRef, ObjectId, TypeName};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::TypeOptions;
use crate::error::{BridgeError, BridgeResult};
use crate::lifecycle;
use crate::namespace::{Namespace, NamespaceId};
use crate::registry::ConversionRegistry;

/// Cache key of a generated type: one per (class, namespace) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub class: ClassId,
    pub namespace: NamespaceId,
}

/// A constructor variant, selected by arity.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDescriptor {
    pub index: usize,
    pub parameter_types: Vec<TypeName>,
}

/// A callable member derived from the class metaobject.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDescriptor {
    pub name: String,
    pub signature: String,
    /// Native method index; equals the method's enumeration position.
    pub index: usize,
    pub kind: MethodKind,
    pub parameter_types: Vec<TypeName>,
    pub return_type: TypeName,
    pub doc: String,
}

impl MemberDescriptor {
    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }

    pub fn is_signal(&self) -> bool {
        self.kind == MethodKind::Signal
    }
}

/// Scripting-visible type generated for a native class.
///
/// Immutable once built. Instances are shared through the context's type
/// cache, so two lookups for the same class and namespace return the same
/// `Arc`. The namespace binds the type, so the type only holds it weakly.
pub struct WrapperType {
    meta: &'static dyn MetaObject,
    namespace: Weak<Namespace>,
    namespace_id: NamespaceId,
    name: String,
    full_name: String,
    doc: Option<String>,
    constructors: Vec<ConstructorDescriptor>,
    members: Vec<MemberDescriptor>,
    by_name: FxHashMap<String, Vec<usize>>,
}

impl WrapperType {
    /// Derive the wrapper type for `meta`, validating every signature
    /// against `registry`.
    pub(crate) fn build(
        registry: &ConversionRegistry,
        meta: &'static dyn MetaObject,
        namespace: Arc<Namespace>,
        options: &TypeOptions,
        check_constructor: bool,
        max_arguments: usize,
        qualified: bool,
    ) -> BridgeResult<Self> {
        let class = meta.class_name();
        if check_constructor && meta.constructors().is_empty() {
            return Err(BridgeError::Configuration(format!(
                "no constructor for class '{class}'"
            )));
        }

        let mut constructors = Vec::with_capacity(meta.constructors().len());
        for (index, ctor) in meta.constructors().iter().enumerate() {
            check_arity(class, "constructor", ctor.parameter_types.len(), max_arguments)?;
            for param in &ctor.parameter_types {
                registry.native_builder(param)?;
            }
            constructors.push(ConstructorDescriptor {
                index,
                parameter_types: ctor.parameter_types.clone(),
            });
        }

        let mut members = Vec::new();
        let mut by_name: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (index, method) in meta.methods().iter().enumerate() {
            let name = method.name();
            if !options.exposes(name, method.kind) {
                continue;
            }
            check_arity(class, &method.signature, method.parameter_types.len(), max_arguments)?;
            for param in &method.parameter_types {
                registry.native_builder(param)?;
            }
            registry.script_builder(&method.return_type)?;

            by_name.entry(name.to_string()).or_default().push(members.len());
            members.push(MemberDescriptor {
                name: name.to_string(),
                signature: method.signature.clone(),
                index,
                kind: method.kind,
                parameter_types: method.parameter_types.clone(),
                return_type: method.return_type.clone(),
                doc: format!("{} {}", method.return_type, method.signature),
            });
        }

        let name = options
            .class_name
            .clone()
            .unwrap_or_else(|| class.to_string());
        let full_name = if qualified {
            format!("{}.{}", namespace.name(), name)
        } else {
            name.clone()
        };

        debug!(
            target: "metabridge::types",
            class,
            %full_name,
            constructors = constructors.len(),
            members = members.len(),
            "built wrapper type"
        );

        Ok(Self {
            meta,
            namespace: Arc::downgrade(&namespace),
            namespace_id: namespace.id(),
            name,
            full_name,
            doc: options.doc.clone(),
            constructors,
            members,
            by_name,
        })
    }

    pub fn meta_object(&self) -> &'static dyn MetaObject {
        self.meta
    }

    pub fn key(&self) -> TypeKey {
        TypeKey {
            class: ClassId::of(self.meta),
            namespace: self.namespace_id,
        }
    }

    /// Hosting namespace; `None` once it has been dropped.
    pub fn namespace(&self) -> Option<Arc<Namespace>> {
        self.namespace.upgrade()
    }

    /// Script-visible name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Overloads sharing `name`, in declaration order.
    pub fn overloads(&self, name: &str) -> impl Iterator<Item = &MemberDescriptor> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(|&i| &self.members[i])
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Find the member with native method index `index`.
    pub fn member_by_index(&self, index: usize) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.index == index)
    }

    /// Resolve a member by full signature or by name.
    ///
    /// A name resolves to its first signal overload if there is one, else
    /// its first overload.
    pub fn resolve(&self, signature: &str) -> Option<&MemberDescriptor> {
        if signature.contains('(') {
            return self
                .meta
                .index_of_method(signature)
                .and_then(|index| self.member_by_index(index));
        }
        self.overloads(signature)
            .find(|m| m.is_signal())
            .or_else(|| self.overloads(signature).next())
    }

    /// Pick the overload for a call with `provided` arguments: exact arity
    /// first, then the first overload that accepts that many.
    pub fn select_overload(
        &self,
        name: &str,
        provided: usize,
    ) -> BridgeResult<&MemberDescriptor> {
        let first = self
            .overloads(name)
            .next()
            .ok_or_else(|| BridgeError::MethodNotFound(format!("{}::{}", self.name, name)))?;
        self.overloads(name)
            .find(|m| m.parameter_count() == provided)
            .or_else(|| self.overloads(name).find(|m| provided <= m.parameter_count()))
            .ok_or_else(|| BridgeError::ArgumentCountMismatch {
                member: format!("{}::{}", self.name, name),
                expected: first.parameter_count(),
                provided,
            })
    }
}

fn check_arity(class: &str, member: &str, count: usize, max: usize) -> BridgeResult<()> {
    if count > max {
        return Err(BridgeError::Configuration(format!(
            "{class}::{member} takes {count} arguments, at most {max} are supported"
        )));
    }
    Ok(())
}

impl fmt::Debug for WrapperType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperType")
            .field("full_name", &self.full_name)
            .field("constructors", &self.constructors.len())
            .field("members", &self.members.len())
            .finish()
    }
}

// ============================================================================
// Instances
// ============================================================================

/// Script handle to a native object.
///
/// When the last handle is dropped and the instance is script-owned, the
/// native object is asked to delete itself. Foreign-owned instances leave
/// the native object alone.
pub struct WrapperInstance {
    object: NativeObjectRef,
    ty: Arc<WrapperType>,
    foreign_owned: AtomicBool,
}

impl WrapperInstance {
    pub(crate) fn new(object: NativeObjectRef, ty: Arc<WrapperType>, script_owned: bool) -> Arc<Self> {
        Arc::new(Self {
            object,
            ty,
            foreign_owned: AtomicBool::new(!script_owned),
        })
    }

    pub fn object(&self) -> &NativeObjectRef {
        &self.object
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::of(&self.object)
    }

    pub fn wrapper_type(&self) -> &Arc<WrapperType> {
        &self.ty
    }

    pub fn is_foreign_owned(&self) -> bool {
        self.foreign_owned.load(Ordering::Acquire)
    }

    pub(crate) fn set_foreign_owned(&self, foreign: bool) {
        self.foreign_owned.store(foreign, Ordering::Release);
    }
}

impl Drop for WrapperInstance {
    fn drop(&mut self) {
        lifecycle::on_wrapper_finalized(self);
    }
}

impl fmt::Debug for WrapperInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperInstance")
            .field("type", &self.ty.full_name)
            .field("object", &self.object_id())
            .field("foreign_owned", &self.is_foreign_owned())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metabridge_core::{ConstructorInfo, GenericArgument, MethodInfo, NativeError, NativeObject};

    struct Meta {
        constructors: Vec<ConstructorInfo>,
        methods: Vec<MethodInfo>,
    }

    impl MetaObject for Meta {
        fn class_name(&self) -> &str {
            "Widget"
        }

        fn constructors(&self) -> &[ConstructorInfo] {
            &self.constructors
        }

        fn methods(&self) -> &[MethodInfo] {
            &self.methods
        }

        fn construct(
            &self,
            index: usize,
            _args: &mut [GenericArgument<'_>],
        ) -> Result<NativeObjectRef, NativeError> {
            Err(NativeError::NoSuchConstructor(index))
        }

        fn invoke(
            &self,
            _object: &dyn NativeObject,
            index: usize,
            _ret: Option<&mut GenericArgument<'_>>,
            _args: &mut [GenericArgument<'_>],
        ) -> Result<(), NativeError> {
            Err(NativeError::NoSuchMethod(index))
        }
    }

    fn meta(methods: Vec<MethodInfo>) -> &'static dyn MetaObject {
        Box::leak(Box::new(Meta {
            constructors: vec![ConstructorInfo::default()],
            methods,
        }))
    }

    fn slot(signature: &str, params: Vec<TypeName>, ret: TypeName) -> MethodInfo {
        MethodInfo::new(signature, params, ret, MethodKind::Slot)
    }

    fn build(meta: &'static dyn MetaObject) -> BridgeResult<WrapperType> {
        WrapperType::build(
            &ConversionRegistry::with_defaults(),
            meta,
            Namespace::new("ui"),
            &TypeOptions::default(),
            true,
            10,
            true,
        )
    }

    #[test]
    fn overloads_share_a_name() {
        let ty = build(meta(vec![
            slot("resize(int)", vec![TypeName::INT], TypeName::VOID),
            MethodInfo::new("resized(int)", vec![TypeName::INT], TypeName::VOID, MethodKind::Signal),
            slot("resize(int,int)", vec![TypeName::INT, TypeName::INT], TypeName::VOID),
        ]))
        .unwrap();

        assert_eq!(ty.full_name(), "ui.Widget");
        assert_eq!(ty.overloads("resize").map(|m| m.index).collect::<Vec<_>>(), [0, 2]);
        assert_eq!(ty.select_overload("resize", 2).unwrap().index, 2);
        assert_eq!(ty.select_overload("resize", 0).unwrap().index, 0);
        assert!(matches!(
            ty.select_overload("resize", 3),
            Err(BridgeError::ArgumentCountMismatch { provided: 3, .. })
        ));
    }

    #[test]
    fn resolve_by_signature_or_name() {
        let ty = build(meta(vec![
            slot("value()", vec![], TypeName::INT),
            MethodInfo::new("value(int)", vec![TypeName::INT], TypeName::VOID, MethodKind::Signal),
        ]))
        .unwrap();

        assert_eq!(ty.resolve("value()").unwrap().index, 0);
        assert_eq!(ty.resolve("value").unwrap().index, 1);
        assert!(ty.resolve("value(double)").is_none());
        assert!(ty.resolve("missing").is_none());
    }

    #[test]
    fn void_parameters_are_rejected() {
        let err = build(meta(vec![slot("bad(void)", vec![TypeName::VOID], TypeName::VOID)]))
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnknownType { .. }));
    }
}
