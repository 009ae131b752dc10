//! Class metadata
//!
//! A [`Class`] is the runtime identity of a type: its name, parent, modifiers,
//! constructors and methods. Classes are immutable once built apart from the
//! method table, which accepts late additions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ReflectError, ReflectResult};
use crate::intercept::{view_as, Interceptor, InterceptorView};
use crate::method::{Constructor, Method, StateBox};
use crate::object::{Instance, Object};
use crate::param::{check_arguments, render_signature, ParamType};
use crate::value::Value;

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique class identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    fn next() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric identity
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Member visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Callable from anywhere
    #[default]
    Public,
    /// Callable from subclasses
    Protected,
    /// Callable from the declaring class only
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// Class-level modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Cannot be subclassed
    pub is_final: bool,
    /// Cannot be instantiated
    pub is_abstract: bool,
}

/// Shared class handle
pub type ClassRef = Arc<Class>;

/// Runtime type
pub struct Class {
    id: ClassId,
    name: Arc<str>,
    parent: Option<ClassRef>,
    modifiers: Modifiers,
    /// Type arguments bound on the parent, in declaration order
    type_arguments: Vec<ParamType>,
    constructors: Vec<Constructor>,
    /// Overloads by method name, in declaration order
    methods: RwLock<FxHashMap<Arc<str>, Vec<Arc<Method>>>>,
    /// Bumped on every method table change
    revision: AtomicU64,
    interceptor_view: Option<InterceptorView>,
}

impl Class {
    /// Class identity
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct parent, if any
    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_ref()
    }

    /// Class-level modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether the class cannot be subclassed
    pub fn is_final(&self) -> bool {
        self.modifiers.is_final
    }

    /// Whether the class cannot be instantiated
    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract
    }

    /// Declared constructors
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Type arguments this class binds on its parent
    pub fn type_arguments(&self) -> &[ParamType] {
        &self.type_arguments
    }

    /// This class followed by its ancestors, nearest first
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Whether this class is `other` or one of its descendants
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self.ancestors().any(|c| c.id == other.id)
    }

    /// Whether this class or an ancestor is named `name`
    pub fn conforms_to(&self, name: &str) -> bool {
        self.ancestors().any(|c| &*c.name == name)
    }

    /// Declare a method, replacing any existing method with the same signature
    pub fn add_method(&self, method: Method) -> Arc<Method> {
        let method = Arc::new(method.declared_by(&self.name));
        let mut methods = self.methods.write();
        let overloads = methods.entry(method.descriptor().name.clone()).or_default();
        match overloads
            .iter_mut()
            .find(|m| m.params() == method.params())
        {
            Some(slot) => *slot = method.clone(),
            None => overloads.push(method.clone()),
        }
        // Bumped after the table change and before the lock is released, so
        // a reader that loads the new revision also sees the new method
        self.revision.fetch_add(1, Ordering::Release);
        method
    }

    /// Method table revision of this class and its ancestors
    ///
    /// Changes whenever a method is added to or replaced in any class of the
    /// chain. Read it before a lookup to tell later whether that lookup is
    /// still current.
    pub fn revision(&self) -> u64 {
        self.ancestors()
            .map(|c| c.revision.load(Ordering::Acquire))
            .fold(0, u64::wrapping_add)
    }

    /// Methods declared directly on this class
    pub fn declared_methods(&self) -> Vec<Arc<Method>> {
        self.methods.read().values().flatten().cloned().collect()
    }

    /// Method declared directly on this class with exactly these parameters
    pub fn find_declared(&self, name: &str, params: &[ParamType]) -> Option<Arc<Method>> {
        self.methods
            .read()
            .get(name)?
            .iter()
            .find(|m| m.params() == params)
            .cloned()
    }

    /// Nearest method with this name and exact parameters, searching ancestors
    pub fn find_method(&self, name: &str, params: &[ParamType]) -> Option<Arc<Method>> {
        self.ancestors().find_map(|c| c.find_declared(name, params))
    }

    /// Most derived instance method whose parameters accept `args`
    pub fn select_overload(&self, name: &str, args: &[Value]) -> Option<Arc<Method>> {
        self.ancestors().find_map(|c| {
            c.methods
                .read()
                .get(name)?
                .iter()
                .find(|m| !m.is_static() && check_arguments(m.params(), args).is_ok())
                .cloned()
        })
    }

    /// Most derived implementation of every method a subclass may override
    ///
    /// Sorted by name then signature.
    pub fn overridable_methods(&self) -> Vec<Arc<Method>> {
        let mut seen: FxHashSet<(Arc<str>, Vec<ParamType>)> = FxHashSet::default();
        let mut result = Vec::new();
        for class in self.ancestors() {
            for method in class.declared_methods() {
                let key = (method.descriptor().name.clone(), method.params().to_vec());
                if seen.insert(key) && method.is_overridable() {
                    result.push(method);
                }
            }
        }
        result.sort_by(|a, b| {
            a.name()
                .cmp(b.name())
                .then_with(|| a.descriptor().signature().cmp(&b.descriptor().signature()))
        });
        result
    }

    /// Constructor with exactly these parameters
    pub fn find_constructor(&self, params: &[ParamType]) -> Option<&Constructor> {
        self.constructors.iter().find(|c| c.params() == params)
    }

    /// Create an instance through the constructor declared with `params`
    ///
    /// Constructor visibility is not enforced.
    pub fn instantiate(
        self: &Arc<Self>,
        params: &[ParamType],
        args: &[Value],
    ) -> ReflectResult<Instance> {
        if self.is_abstract() {
            return Err(ReflectError::construction(
                self.name(),
                "abstract class cannot be instantiated",
            ));
        }
        let ctor = self.find_constructor(params).ok_or_else(|| {
            ReflectError::construction(
                self.name(),
                format!("no constructor ({})", render_signature(params)),
            )
        })?;
        check_arguments(params, args).map_err(|reason| ReflectError::construction(self.name(), reason))?;
        let state: StateBox = ctor
            .build_state(args)
            .map_err(|cause| ReflectError::Construction {
                class: self.name().to_string(),
                reason: "constructor failed".to_string(),
                cause: Some(Box::new(cause)),
            })?;
        Ok(Object::new(self.clone(), state))
    }

    /// Type argument at `index` bound by the nearest ancestor that binds any
    ///
    /// `None` when no class in the chain binds type arguments, or when the
    /// binding class has fewer than `index + 1` arguments.
    pub fn find_type_argument(&self, index: usize) -> Option<ParamType> {
        self.ancestors()
            .find(|c| !c.type_arguments.is_empty())
            .and_then(|c| c.type_arguments.get(index).cloned())
    }

    /// Accessor exposing instances of this class as interceptors
    pub fn interceptor_view(&self) -> Option<InterceptorView> {
        self.interceptor_view
    }

    /// Whether instances of this class can act as interceptors
    pub fn is_interceptor(&self) -> bool {
        self.interceptor_view.is_some()
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("modifiers", &self.modifiers)
            .field("methods", &self.methods.read().values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

/// Iterator over a class and its ancestors
pub struct Ancestors<'a> {
    next: Option<&'a Class>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Class;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

/// Builder for [`Class`]
pub struct ClassBuilder {
    name: Arc<str>,
    parent: Option<ClassRef>,
    modifiers: Modifiers,
    type_arguments: Vec<ParamType>,
    constructors: Vec<Constructor>,
    methods: Vec<Method>,
    interceptor_view: Option<InterceptorView>,
}

impl ClassBuilder {
    /// Start a class with the given name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            parent: None,
            modifiers: Modifiers::default(),
            type_arguments: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            interceptor_view: None,
        }
    }

    /// Set the parent class
    pub fn extends(mut self, parent: &ClassRef) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Bind type arguments on the parent
    pub fn binds(mut self, type_arguments: Vec<ParamType>) -> Self {
        self.type_arguments = type_arguments;
        self
    }

    /// Mark the class final
    pub fn final_class(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    /// Mark the class abstract
    pub fn abstract_class(mut self) -> Self {
        self.modifiers.is_abstract = true;
        self
    }

    /// Add a constructor
    pub fn constructor(mut self, ctor: Constructor) -> Self {
        self.constructors.push(ctor);
        self
    }

    /// Add a zero-argument constructor producing `T::default()`
    pub fn default_constructor<T>(self) -> Self
    where
        T: Default + Send + Sync + 'static,
    {
        self.constructor(Constructor::with_default::<T>())
    }

    /// Add a method
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Expose instances whose state is `I` as interceptors
    pub fn interceptor<I: Interceptor>(mut self) -> Self {
        self.interceptor_view = Some(view_as::<I>);
        self
    }

    /// Finish the class
    pub fn build(self) -> ClassRef {
        let class = Arc::new(Class {
            id: ClassId::next(),
            name: self.name,
            parent: self.parent,
            modifiers: self.modifiers,
            type_arguments: self.type_arguments,
            constructors: self.constructors,
            methods: RwLock::new(FxHashMap::default()),
            revision: AtomicU64::new(0),
            interceptor_view: self.interceptor_view,
        });
        for method in self.methods {
            class.add_method(method);
        }
        class
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ClassRef {
        ClassBuilder::new("Base")
            .default_constructor::<()>()
            .method(Method::instance("name", vec![], ParamType::Str, |_, _| {
                Ok(Value::str("base"))
            }))
            .method(Method::instance("id", vec![ParamType::I32], ParamType::I32, |_, args| {
                Ok(args[0].clone())
            }))
            .method(
                Method::instance("sealed", vec![], ParamType::Void, |_, _| Ok(Value::Null)).as_final(),
            )
            .method(Method::function("make", vec![], ParamType::I32, |_| Ok(Value::I32(0))))
            .build()
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ClassBuilder::new("A").build();
        let b = ClassBuilder::new("A").build();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_lookup_walks_ancestors() {
        let base = base();
        let derived = ClassBuilder::new("Derived").extends(&base).build();

        let found = derived.find_method("name", &[]).unwrap();
        assert_eq!(&*found.descriptor().declaring_class, "Base");
        assert!(derived.find_method("name", &[ParamType::I32]).is_none());
        assert!(derived.is_subclass_of(&base));
        assert!(!base.is_subclass_of(&derived));
        assert!(derived.conforms_to("Base"));
    }

    #[test]
    fn test_add_method_replaces_same_signature() {
        let class = ClassBuilder::new("C").build();
        class.add_method(Method::instance("f", vec![], ParamType::I32, |_, _| Ok(Value::I32(1))));
        class.add_method(Method::instance("f", vec![], ParamType::I32, |_, _| Ok(Value::I32(2))));
        class.add_method(Method::instance("f", vec![ParamType::I32], ParamType::I32, |_, _| {
            Ok(Value::I32(3))
        }));
        assert_eq!(class.declared_methods().len(), 2);
    }

    #[test]
    fn test_revision_tracks_ancestor_changes() {
        let base = base();
        let derived = ClassBuilder::new("Derived").extends(&base).build();
        let before = derived.revision();

        derived.add_method(Method::instance("extra", vec![], ParamType::Void, |_, _| Ok(Value::Null)));
        let after_own = derived.revision();
        assert_ne!(before, after_own);

        base.add_method(Method::instance("name", vec![], ParamType::Str, |_, _| {
            Ok(Value::str("renamed"))
        }));
        assert_ne!(after_own, derived.revision());
        assert_eq!(derived.revision(), derived.revision());
    }

    #[test]
    fn test_overridable_methods() {
        let base = base();
        let derived = ClassBuilder::new("Derived")
            .extends(&base)
            .method(
                Method::instance("name", vec![], ParamType::Str, |_, _| Ok(Value::str("derived")))
                    .as_final(),
            )
            .build();

        let names: Vec<String> = base
            .overridable_methods()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, vec!["id", "name"]);

        // A final override hides the overridable parent method
        let names: Vec<String> = derived
            .overridable_methods()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, vec!["id"]);
    }

    #[test]
    fn test_instantiate_errors() {
        let abstract_class = ClassBuilder::new("Shape")
            .abstract_class()
            .default_constructor::<()>()
            .build();
        assert!(matches!(
            abstract_class.instantiate(&[], &[]),
            Err(ReflectError::Construction { .. })
        ));

        let base = base();
        let err = base.instantiate(&[ParamType::I32], &[Value::I32(1)]).unwrap_err();
        assert!(err.to_string().contains("no constructor (i32)"));

        let failing = ClassBuilder::new("Failing")
            .constructor(Constructor::new(vec![], |_| Err(ReflectError::thrown("nope"))))
            .build();
        let err = failing.instantiate(&[], &[]).unwrap_err();
        assert!(matches!(err.root_cause(), ReflectError::Thrown(m) if m == "nope"));
    }

    #[test]
    fn test_find_type_argument() {
        let generic = ClassBuilder::new("Repository").build();
        let users = ClassBuilder::new("UserRepository")
            .extends(&generic)
            .binds(vec![ParamType::object("User"), ParamType::I64])
            .build();
        let cached = ClassBuilder::new("CachedUserRepository").extends(&users).build();

        assert_eq!(users.find_type_argument(0), Some(ParamType::object("User")));
        assert_eq!(cached.find_type_argument(1), Some(ParamType::I64));
        assert_eq!(cached.find_type_argument(2), None);
        assert_eq!(generic.find_type_argument(0), None);
    }
}
