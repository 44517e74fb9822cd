use serde::{Deserialize, Serialize};

use crate::descriptor::{kotlin_class_to_jvm, method_descriptor, Dialect};
use crate::method::MethodInformation;
use crate::names::qualified_to_binary;
use crate::origin::Origin;

/// A type variable in scope of a declaration and its declared bounds, as type text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeParameter {
    pub name: String,
    #[serde(default)]
    pub bounds: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_final: bool,
    pub is_private: bool,
    pub is_abstract: bool,
    pub is_constructor: bool,
}

/// A Java method as resolved by the host editor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JavaMethod {
    /// Qualified name of the containing class; `None` for anonymous or local classes.
    pub containing_class: Option<String>,
    pub name: String,
    /// Canonical type text of each parameter, e.g. `java.util.List<java.lang.String>`.
    #[serde(default)]
    pub parameter_types: Vec<String>,
    /// `None` for `void` and constructors.
    #[serde(default)]
    pub return_type: Option<String>,
    /// Type variables in scope: the method's own and the containing class's.
    #[serde(default)]
    pub type_parameters: Vec<TypeParameter>,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub origin: Origin,
}

/// A Kotlin function as resolved by the host editor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KotlinFunction {
    /// Fully qualified name of the containing declaration (class or file facade).
    pub containing_declaration: Option<String>,
    pub name: String,
    #[serde(default)]
    pub value_parameter_types: Vec<String>,
    /// `None` for `Unit` and constructors.
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub type_parameters: Vec<TypeParameter>,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub origin: Origin,
}

/// What the analysis needs from a resolved call target, regardless of front end.
pub trait Callable {
    /// `None` when the declaring class is unknown.
    fn method_identity(&self) -> Option<MethodInformation>;

    fn descriptor(&self) -> String;

    fn origin(&self) -> &Origin;
}

impl Callable for JavaMethod {
    fn method_identity(&self) -> Option<MethodInformation> {
        let owner = self.containing_class.as_deref()?;
        Some(MethodInformation::new(
            qualified_to_binary(owner),
            jvm_name(&self.name, &self.modifiers),
            self.descriptor(),
        ))
    }

    fn descriptor(&self) -> String {
        let return_type = if self.modifiers.is_constructor {
            None
        } else {
            self.return_type.as_deref()
        };
        method_descriptor(
            Dialect::Java,
            &self.parameter_types,
            return_type,
            &self.type_parameters,
        )
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl Callable for KotlinFunction {
    fn method_identity(&self) -> Option<MethodInformation> {
        let owner = self.containing_declaration.as_deref()?;
        Some(MethodInformation::new(
            kotlin_class_to_jvm(owner),
            jvm_name(&self.name, &self.modifiers),
            self.descriptor(),
        ))
    }

    fn descriptor(&self) -> String {
        let return_type = if self.modifiers.is_constructor {
            None
        } else {
            self.return_type.as_deref()
        };
        method_descriptor(
            Dialect::Kotlin,
            &self.value_parameter_types,
            return_type,
            &self.type_parameters,
        )
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

fn jvm_name(name: &str, modifiers: &Modifiers) -> String {
    if modifiers.is_constructor {
        "<init>".to_string()
    } else {
        name.to_string()
    }
}

/// A call target resolved by one of the front ends.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "dialect", rename_all = "lowercase")]
pub enum ResolvedCallable {
    Java(JavaMethod),
    Kotlin(KotlinFunction),
}

impl ResolvedCallable {
    pub fn name(&self) -> &str {
        match self {
            ResolvedCallable::Java(method) => &method.name,
            ResolvedCallable::Kotlin(function) => &function.name,
        }
    }

    pub fn modifiers(&self) -> &Modifiers {
        match self {
            ResolvedCallable::Java(method) => &method.modifiers,
            ResolvedCallable::Kotlin(function) => &function.modifiers,
        }
    }

    fn as_callable(&self) -> &dyn Callable {
        match self {
            ResolvedCallable::Java(method) => method,
            ResolvedCallable::Kotlin(function) => function,
        }
    }
}

impl Callable for ResolvedCallable {
    fn method_identity(&self) -> Option<MethodInformation> {
        self.as_callable().method_identity()
    }

    fn descriptor(&self) -> String {
        self.as_callable().descriptor()
    }

    fn origin(&self) -> &Origin {
        self.as_callable().origin()
    }
}
