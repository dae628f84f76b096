//! The algebraic type registry and the function signature table.
//!
//! A [`Registry`] owns everything a workspace knows about names: the fixed
//! built-in types, the user-defined sum types with their constructors, and
//! the generalized signatures of named functions. All of it is reached
//! through the registry's methods, and all of it is dropped by
//! [`Registry::clear`] when the workspace is torn down.
//!
//! # Uniqueness
//! User type names are unique among user types and never coincide with a
//! built-in type. Constructor names are unique across all user types, and
//! are also kept apart from function names since both are looked up in the
//! same namespace when a node's signature is derived.
//!
//! # Derived Signatures
//! Constructor and case signatures are derived on demand from the current
//! definitions rather than cached, so a definition change is visible to the
//! next lookup without any invalidation step. An unset field is typed by a
//! fresh variable in every derivation.

use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{
    error::{Error, Result, TypeError},
    ty::{Ty, syntax::parse_ty},
};

pub mod naming;

use naming::{CONSTRUCTOR_PLACEHOLDER, TYPE_PLACEHOLDER};

pub const BUILTIN_TYPES: [&str; 5] = ["Bool", "Number", "Color", "Picture", "Text"];

/// Combines two case branches into one.
pub const BRANCH: &str = "#";
/// Evaluates a scrutinee before the combined branches.
pub const EVALUATE: &str = "1ev";
/// Tags a scrutinee with the name of its type.
pub const SCRUTINEE: &str = "1const";

const PRELUDE: [(&str, &str); 3] = [
    (BRANCH, "a -> a -> a"),
    (EVALUATE, "e -> a -> a"),
    (SCRUTINEE, "a -> a -> a"),
];

/// Parametric type constructors that are always in scope.
const BUILTIN_CONSTRUCTORS: [&str; 1] = [crate::graph::kind::LIST_TYPE];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserType {
    pub name: Box<str>,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub constructor: Box<str>,
    /// Field types, or `None` for a field whose type is not set yet.
    pub fields: Vec<Option<Arc<Ty>>>,
}

impl Variant {
    pub fn new(
        constructor: impl Into<Box<str>>,
        fields: impl IntoIterator<Item = Option<Arc<Ty>>>,
    ) -> Self {
        Self {
            constructor: constructor.into(),
            fields: fields.into_iter().collect(),
        }
    }
}

/// A constructor as listed for the editor's toolbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorInfo {
    pub name: Box<str>,
    pub owner: Box<str>,
    pub fields: Vec<Option<Arc<Ty>>>,
}

#[derive(Debug, Clone, Default)]
pub struct SignatureTable(HashMap<Box<str>, Arc<Ty>>);

impl SignatureTable {
    pub fn get(&self, name: &str) -> Option<&Arc<Ty>> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn insert(&mut self, name: Box<str>, signature: Arc<Ty>) {
        self.0.insert(name, signature);
    }

    fn rename_literal(&mut self, old: &str, new: &str) {
        for signature in self.0.values_mut() {
            *signature = signature.rename_literal(old, new);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: Vec<UserType>,
    functions: SignatureTable,
}

impl Registry {
    /// Returns a registry with the built-in types and no functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a registry with the built-in types and the case combinators.
    pub fn with_prelude() -> Self {
        let mut registry = Self::new();
        registry.install_prelude();
        registry
    }

    /// Drops every user type and every function outside the prelude.
    pub fn clear(&mut self) {
        self.types.clear();
        self.functions = SignatureTable::default();
        self.install_prelude();
        debug!("cleared the registry");
    }

    fn install_prelude(&mut self) {
        for (name, src) in PRELUDE {
            if let Ok(signature) = parse_ty(src) {
                self.functions.insert(name.into(), signature);
            }
        }
    }

    // FUNCTIONS

    pub fn define_function(&mut self, name: &str, signature: Arc<Ty>) -> Result {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidName(name.into()));
        }

        // the case combinators cannot be redefined
        if self.constructor(name).is_some() || PRELUDE.iter().any(|&(reserved, _)| reserved == name) {
            return Err(Error::InvalidName(name.into()));
        }

        debug!(name, %signature, "defined a function");
        self.functions.insert(name.into(), signature);
        Ok(())
    }

    pub fn function(&self, name: &str) -> Option<&Arc<Ty>> {
        self.functions.get(name)
    }

    /// The generalized signature of a function or constructor.
    pub fn signature(&self, name: &str) -> Option<Arc<Ty>> {
        self.function(name)
            .cloned()
            .or_else(|| self.constructor_signature(name))
    }

    // TYPE NAMES

    pub fn is_builtin_type(&self, name: &str) -> bool {
        BUILTIN_TYPES.contains(&name)
    }

    /// Returns `true` if `name` is a built-in type, a built-in parametric
    /// type or a user type.
    pub fn is_known_type(&self, name: &str) -> bool {
        self.is_builtin_type(name)
            || BUILTIN_CONSTRUCTORS.contains(&name)
            || self.user_type(name).is_some()
    }

    pub fn propose_type_name(&self, candidate: &str) -> std::result::Result<Box<str>, TypeError> {
        naming::propose(candidate, TYPE_PLACEHOLDER, |name| self.is_known_type(name))
    }

    pub fn propose_constructor_name(
        &self,
        candidate: &str,
    ) -> std::result::Result<Box<str>, TypeError> {
        self.propose_constructor_name_except(candidate, &[])
    }

    fn propose_constructor_name_except(
        &self,
        candidate: &str,
        reserved: &[Box<str>],
    ) -> std::result::Result<Box<str>, TypeError> {
        naming::propose(candidate, CONSTRUCTOR_PLACEHOLDER, |name| {
            self.constructor(name).is_some()
                || self.functions.contains(name)
                || reserved.iter().any(|r| r.as_ref() == name)
        })
    }

    // USER TYPES

    pub fn user_type(&self, name: &str) -> Option<&UserType> {
        self.types.iter().find(|ty| ty.name.as_ref() == name)
    }

    pub fn user_types(&self) -> &[UserType] {
        &self.types
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.types.iter().map(|ty| ty.name.as_ref()).collect()
    }

    /// Every constructor with its owning type and field types.
    pub fn constructors(&self) -> Vec<ConstructorInfo> {
        self.types
            .iter()
            .flat_map(|ty| {
                ty.variants.iter().map(|variant| ConstructorInfo {
                    name: variant.constructor.clone(),
                    owner: ty.name.clone(),
                    fields: variant.fields.clone(),
                })
            })
            .collect()
    }

    /// Finds the type that owns the constructor `name`, and the position of
    /// its variant.
    pub fn constructor(&self, name: &str) -> Option<(&UserType, usize)> {
        self.types.iter().find_map(|ty| {
            ty.variants
                .iter()
                .position(|variant| variant.constructor.as_ref() == name)
                .map(|index| (ty, index))
        })
    }

    /// Defines a new sum type. The type name and every constructor name are
    /// proposed from the given candidates, and the final type name is
    /// returned.
    pub fn define_type(&mut self, candidate: &str, variants: Vec<Variant>) -> Result<Box<str>> {
        let name = self.propose_type_name(candidate)?;

        let mut named = Vec::with_capacity(variants.len());
        let mut reserved = Vec::with_capacity(variants.len());
        for variant in variants {
            let constructor = self.propose_constructor_name_except(&variant.constructor, &reserved)?;
            reserved.push(constructor.clone());
            named.push(Variant {
                constructor,
                fields: variant.fields,
            });
        }

        debug!(%name, variants = named.len(), "defined a user type");
        self.types.push(UserType {
            name: name.clone(),
            variants: named,
        });

        Ok(name)
    }

    /// Renames a user type, rewriting every field type and function
    /// signature that mentions it. Returns the final name.
    pub fn rename_type(&mut self, old: &str, candidate: &str) -> Result<Box<str>> {
        let index = self.type_index(old)?;

        if naming::sanitize(candidate, TYPE_PLACEHOLDER) == old {
            return Ok(old.into());
        }

        let new = self.propose_type_name(candidate)?;
        self.types[index].name = new.clone();
        self.rewrite_fields(|ty| Some(ty.rename_literal(old, &new)));
        self.functions.rename_literal(old, &new);

        debug!(old, %new, "renamed a user type");
        Ok(new)
    }

    /// Renames a constructor. Returns the final name.
    pub fn rename_constructor(&mut self, old: &str, candidate: &str) -> Result<Box<str>> {
        let (owner, variant) = self
            .constructor(old)
            .map(|(owner, variant)| (owner.name.clone(), variant))
            .ok_or_else(|| Error::UnknownConstructor(old.into()))?;

        if naming::sanitize(candidate, CONSTRUCTOR_PLACEHOLDER) == old {
            return Ok(old.into());
        }

        let new = self.propose_constructor_name(candidate)?;
        let index = self.type_index(&owner)?;
        self.types[index].variants[variant].constructor = new.clone();

        debug!(old, %new, "renamed a constructor");
        Ok(new)
    }

    /// Deletes a user type. Fields of other types that mentioned it are
    /// reset to unset.
    pub fn delete_type(&mut self, name: &str) -> Result<UserType> {
        let index = self.type_index(name)?;
        let removed = self.types.remove(index);

        self.rewrite_fields(|ty| match ty.mentions(name) {
            true => None,
            false => Some(ty.clone()),
        });

        debug!(name, "deleted a user type");
        Ok(removed)
    }

    /// Sets the number of variants of a type. New variants receive proposed
    /// constructor names and no fields; the constructors of removed variants
    /// are returned.
    pub fn set_variant_count(&mut self, type_name: &str, count: usize) -> Result<Vec<Box<str>>> {
        let index = self.type_index(type_name)?;
        let current = self.types[index].variants.len();

        if count <= current {
            let removed = self.types[index]
                .variants
                .drain(count..)
                .map(|variant| variant.constructor)
                .collect();

            debug!(type_name, count, "removed variants");
            return Ok(removed);
        }

        for _ in current..count {
            let constructor = self.propose_constructor_name(CONSTRUCTOR_PLACEHOLDER)?;
            self.types[index].variants.push(Variant::new(constructor, Vec::new()));
        }

        debug!(type_name, count, "added variants");
        Ok(Vec::new())
    }

    /// Sets the number of fields of a variant. New fields are unset.
    pub fn set_field_count(&mut self, type_name: &str, variant: usize, count: usize) -> Result {
        let variant = self.variant_mut(type_name, variant)?;
        variant.fields.resize(count, None);
        debug!(type_name, constructor = %variant.constructor, count, "resized a variant");
        Ok(())
    }

    pub fn set_field_type(
        &mut self,
        type_name: &str,
        variant: usize,
        field: usize,
        ty: Option<Arc<Ty>>,
    ) -> Result {
        let target = self
            .variant_mut(type_name, variant)?
            .fields
            .get_mut(field)
            .ok_or_else(|| Error::UnknownField {
                type_name: type_name.into(),
                variant,
                field,
            })?;

        *target = ty;
        Ok(())
    }

    // SIGNATURES

    /// `field_0 -> ... -> field_n -> T`, where `T` owns the constructor.
    pub fn constructor_signature(&self, name: &str) -> Option<Arc<Ty>> {
        let (owner, index) = self.constructor(name)?;
        let params = owner.variants[index]
            .fields
            .iter()
            .map(|field| field.clone().unwrap_or_else(Ty::var))
            .collect();

        Some(Ty::curried(params, Ty::lit(owner.name.clone())))
    }

    /// `T -> r -> ... -> r -> r`, with one `r` per variant of `T`.
    pub fn case_signature(&self, type_name: &str) -> Option<Arc<Ty>> {
        let ty = self.user_type(type_name)?;
        let result = Ty::var();

        let params = std::iter::once(Ty::lit(ty.name.clone()))
            .chain(std::iter::repeat_n(result.clone(), ty.variants.len()))
            .collect();

        Some(Ty::curried(params, result))
    }

    // UTILITY FUNCTIONS

    fn type_index(&self, name: &str) -> Result<usize> {
        self.types
            .iter()
            .position(|ty| ty.name.as_ref() == name)
            .ok_or_else(|| Error::UnknownType(name.into()))
    }

    fn variant_mut(&mut self, type_name: &str, variant: usize) -> Result<&mut Variant> {
        let index = self.type_index(type_name)?;
        self.types[index]
            .variants
            .get_mut(variant)
            .ok_or_else(|| Error::UnknownVariant {
                type_name: type_name.into(),
                index: variant,
            })
    }

    fn rewrite_fields(&mut self, mut f: impl FnMut(&Arc<Ty>) -> Option<Arc<Ty>>) {
        for field in self
            .types
            .iter_mut()
            .flat_map(|ty| ty.variants.iter_mut())
            .flat_map(|variant| variant.fields.iter_mut())
        {
            if let Some(ty) = field.as_ref() {
                *field = f(ty);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> Option<Arc<Ty>> {
        Some(Ty::lit("Number"))
    }

    fn shapes() -> Registry {
        let mut registry = Registry::with_prelude();
        registry
            .define_type(
                "Shape",
                vec![
                    Variant::new("Circle", [number()]),
                    Variant::new("Square", [number()]),
                ],
            )
            .unwrap();
        registry
    }

    #[test]
    fn prelude_combinators() {
        let registry = Registry::with_prelude();
        assert_eq!(registry.function(BRANCH).unwrap().to_string(), "a -> a -> a");
        assert_eq!(registry.function(EVALUATE).unwrap().to_string(), "a -> b -> b");
        assert!(Registry::new().function(BRANCH).is_none());
    }

    #[test]
    fn prelude_combinators_are_reserved() {
        let mut registry = Registry::with_prelude();

        for name in [BRANCH, EVALUATE, SCRUTINEE] {
            assert_eq!(
                registry.define_function(name, Ty::lit("Number")),
                Err(Error::InvalidName(name.into()))
            );
        }

        assert_eq!(registry.function(BRANCH).unwrap().to_string(), "a -> a -> a");
    }

    #[test]
    fn constructor_and_case_signatures() {
        let registry = shapes();

        assert_eq!(registry.type_names(), vec!["Shape"]);
        assert_eq!(
            registry.constructor_signature("Circle").unwrap().to_string(),
            "Number -> Shape"
        );
        assert_eq!(
            registry.constructor_signature("Square").unwrap().to_string(),
            "Number -> Shape"
        );
        assert_eq!(
            registry.case_signature("Shape").unwrap().to_string(),
            "Shape -> a -> a -> a"
        );

        let constructors = registry.constructors();
        assert_eq!(constructors.len(), 2);
        assert_eq!(constructors[1].name.as_ref(), "Square");
        assert_eq!(constructors[1].owner.as_ref(), "Shape");
    }

    #[test]
    fn unset_fields_are_fresh_variables() {
        let mut registry = Registry::with_prelude();
        registry
            .define_type("Box", vec![Variant::new("MkBox", [None, None])])
            .unwrap();

        let sig = registry.constructor_signature("MkBox").unwrap();
        assert_eq!(sig.to_string(), "a -> b -> Box");
    }

    #[test]
    fn names_are_unique() {
        let mut registry = shapes();

        // built-in names are reserved
        let name = registry.define_type("Number", vec![]).unwrap();
        assert_eq!(name.as_ref(), "Number2");

        // constructors are not namespaced per type
        let name = registry
            .define_type("Solid", vec![
                    Variant::new("Circle", Vec::new()),
                    Variant::new("Circle", Vec::new()),
                ],)
            .unwrap();
        let solid = registry.user_type(&name).unwrap();
        assert_eq!(solid.variants[0].constructor.as_ref(), "Circle2");
        assert_eq!(solid.variants[1].constructor.as_ref(), "Circle3");

        // nor may they shadow functions
        registry
            .define_function("Dot", parse_ty("Number -> Picture").unwrap())
            .unwrap();
        assert_eq!(registry.propose_constructor_name("Dot").unwrap().as_ref(), "Dot2");
    }

    #[test]
    fn renaming_types_rewrites_fields() {
        let mut registry = shapes();
        registry
            .define_type("Scene", vec![Variant::new("Scene", [Some(Ty::lit("Shape"))])])
            .unwrap();

        let new = registry.rename_type("Shape", "figure").unwrap();
        assert_eq!(new.as_ref(), "Figure");
        assert!(registry.user_type("Shape").is_none());
        assert_eq!(
            registry.constructor_signature("Scene").unwrap().to_string(),
            "Figure -> Scene"
        );

        // renaming to the current name changes nothing
        assert_eq!(registry.rename_type("Figure", "Figure").unwrap().as_ref(), "Figure");
        assert!(matches!(
            registry.rename_type("Shape", "Other"),
            Err(Error::UnknownType(_))
        ));
    }

    #[test]
    fn renaming_constructors() {
        let mut registry = shapes();

        let new = registry.rename_constructor("Circle", "Disk").unwrap();
        assert_eq!(new.as_ref(), "Disk");
        assert!(registry.constructor("Circle").is_none());
        assert_eq!(registry.constructor("Disk").unwrap().1, 0);

        let clash = registry.rename_constructor("Disk", "Square").unwrap();
        assert_eq!(clash.as_ref(), "Square2");
    }

    #[test]
    fn deleting_types_resets_dependent_fields() {
        let mut registry = shapes();
        registry
            .define_type("Scene", vec![Variant::new("Scene", [Some(Ty::lit("Shape"))])])
            .unwrap();

        let removed = registry.delete_type("Shape").unwrap();
        assert_eq!(removed.variants.len(), 2);
        assert!(registry.constructor("Circle").is_none());
        assert_eq!(registry.user_type("Scene").unwrap().variants[0].fields, vec![None::<Arc<Ty>>]);
    }

    #[test]
    fn mutating_variants_and_fields() {
        let mut registry = shapes();

        registry.set_variant_count("Shape", 3).unwrap();
        let shape = registry.user_type("Shape").unwrap();
        assert_eq!(shape.variants[2].constructor.as_ref(), "Constructor");
        assert_eq!(
            registry.case_signature("Shape").unwrap().to_string(),
            "Shape -> a -> a -> a -> a"
        );

        let removed = registry.set_variant_count("Shape", 1).unwrap();
        assert_eq!(
            removed,
            vec![Box::<str>::from("Square"), Box::<str>::from("Constructor")]
        );

        registry.set_field_count("Shape", 0, 2).unwrap();
        registry
            .set_field_type("Shape", 0, 1, Some(Ty::lit("Color")))
            .unwrap();
        assert_eq!(
            registry.constructor_signature("Circle").unwrap().to_string(),
            "Number -> Color -> Shape"
        );

        assert!(matches!(
            registry.set_field_type("Shape", 0, 5, None),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(
            registry.set_field_count("Shape", 4, 1),
            Err(Error::UnknownVariant { .. })
        ));
    }

    #[test]
    fn clearing_keeps_the_prelude() {
        let mut registry = shapes();
        registry.define_function("circle", parse_ty("Number -> Picture").unwrap()).unwrap();

        registry.clear();
        assert!(registry.user_types().is_empty());
        assert!(registry.function("circle").is_none());
        assert!(registry.function(BRANCH).is_some());
    }
}
