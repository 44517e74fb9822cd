use std::collections::{BTreeMap, BTreeSet};

use jem_analysis::{extract_exceptions, ExtractOptions};
use jem_classfile::{access, ClassFile};
use jem_core::MethodInformation;
use jem_test_utils::{ClassBuilder, CodeBuilder, MethodBuilder};
use pretty_assertions::assert_eq;

fn extract(
    classes: &[ClassBuilder],
    options: ExtractOptions,
) -> BTreeMap<MethodInformation, BTreeSet<String>> {
    let parsed: Vec<ClassFile> = classes
        .iter()
        .map(|class| ClassFile::parse(&class.build()).unwrap())
        .collect();
    extract_exceptions(&parsed, &options)
}

fn exceptions_of(
    results: &BTreeMap<MethodInformation, BTreeSet<String>>,
    owner: &str,
    name: &str,
    descriptor: &str,
) -> Vec<String> {
    results
        .get(&MethodInformation::new(owner, name, descriptor))
        .unwrap_or_else(|| panic!("no entry for {owner}.{name}{descriptor}"))
        .iter()
        .cloned()
        .collect()
}

fn single_method(name: &str, code: CodeBuilder) -> ClassBuilder {
    ClassBuilder::class("p/Subject").method(MethodBuilder::new(name, "()V").code(code))
}

#[test]
fn declared_exceptions_are_reported() {
    let class = ClassBuilder::class("p/Reader")
        .method(
            MethodBuilder::new("read", "()I")
                .throws("java/io/IOException")
                .throws("p/ParseError"),
        )
        .method(MethodBuilder::new("close", "()V"));
    let results = extract(&[class], ExtractOptions::default());

    assert_eq!(
        exceptions_of(&results, "p.Reader", "read", "()I"),
        vec!["java.io.IOException", "p.ParseError"]
    );
    assert!(exceptions_of(&results, "p.Reader", "close", "()V").is_empty());
}

#[test]
fn thrown_exceptions_are_reported() {
    let class = single_method(
        "fail",
        CodeBuilder::new().throw_new("java/lang/IllegalStateException"),
    );
    let results = extract(&[class], ExtractOptions::default());
    assert_eq!(
        exceptions_of(&results, "p.Subject", "fail", "()V"),
        vec!["java.lang.IllegalStateException"]
    );
}

#[test]
fn handler_for_a_builtin_supertype_catches() {
    let body = CodeBuilder::new().throw_new("java/io/FileNotFoundException");
    let end = body.pc();
    let body = body
        .astore(1)
        .return_()
        .handler(0, end, end, Some("java/io/IOException"));
    let results = extract(&[single_method("open", body)], ExtractOptions::default());
    assert!(exceptions_of(&results, "p.Subject", "open", "()V").is_empty());
}

#[test]
fn handler_for_an_unrelated_type_does_not_catch() {
    let body = CodeBuilder::new().throw_new("java/lang/NullPointerException");
    let end = body.pc();
    let body = body
        .astore(1)
        .return_()
        .handler(0, end, end, Some("java/io/IOException"));
    let results = extract(&[single_method("open", body)], ExtractOptions::default());
    assert_eq!(
        exceptions_of(&results, "p.Subject", "open", "()V"),
        vec!["java.lang.NullPointerException"]
    );
}

#[test]
fn catch_all_handlers_do_not_filter() {
    let body = CodeBuilder::new().throw_new("java/lang/IllegalArgumentException");
    let end = body.pc();
    let body = body.astore(1).aload(1).athrow().handler(0, end, end, None);
    let results = extract(&[single_method("guarded", body)], ExtractOptions::default());
    assert_eq!(
        exceptions_of(&results, "p.Subject", "guarded", "()V"),
        vec!["java.lang.IllegalArgumentException"]
    );
}

#[test]
fn handlers_use_the_container_hierarchy() {
    let base = ClassBuilder::class("p/BaseError").extends("java/lang/Exception");
    let specific = ClassBuilder::class("p/SpecificError").extends("p/BaseError");

    let caught = CodeBuilder::new().throw_new("p/SpecificError");
    let end = caught.pc();
    let caught = caught
        .astore(1)
        .return_()
        .handler(0, end, end, Some("p/BaseError"));
    let subject = single_method("handled", caught);

    let results = extract(&[base, specific, subject], ExtractOptions::default());
    assert!(exceptions_of(&results, "p.Subject", "handled", "()V").is_empty());
}

#[test]
fn constructor_arguments_do_not_change_the_thrown_type() {
    let body = CodeBuilder::new()
        .new_("p/WrapperError")
        .dup()
        .new_("p/Cause")
        .dup()
        .invokespecial("p/Cause", "<init>", "()V")
        .invokespecial("p/WrapperError", "<init>", "(Ljava/lang/Throwable;)V")
        .athrow();
    let results = extract(&[single_method("wrap", body)], ExtractOptions::default());
    assert_eq!(
        exceptions_of(&results, "p.Subject", "wrap", "()V"),
        vec!["p.WrapperError"]
    );
}

#[test]
fn exceptions_returned_by_factories_are_reported() {
    let factory = ClassBuilder::class("p/Errors").method(
        MethodBuilder::new("unsupported", "()Ljava/lang/UnsupportedOperationException;")
            .access(access::ACC_PUBLIC | access::ACC_STATIC),
    );
    let subject = single_method(
        "fail",
        CodeBuilder::new()
            .invokestatic(
                "p/Errors",
                "unsupported",
                "()Ljava/lang/UnsupportedOperationException;",
            )
            .athrow(),
    );
    let results = extract(&[factory, subject], ExtractOptions::default());
    assert_eq!(
        exceptions_of(&results, "p.Subject", "fail", "()V"),
        vec!["java.lang.UnsupportedOperationException"]
    );
}

#[test]
fn rethrowing_a_local_is_not_attributed() {
    let class = ClassBuilder::class("p/Subject").method(
        MethodBuilder::new("rethrow", "(Ljava/lang/Exception;)V")
            .code(CodeBuilder::new().aload(1).athrow()),
    );
    let results = extract(&[class], ExtractOptions::default());
    assert!(exceptions_of(&results, "p.Subject", "rethrow", "(Ljava/lang/Exception;)V").is_empty());
}

fn service_classes() -> Vec<ClassBuilder> {
    let service = ClassBuilder::class("p/Service")
        .method(
            MethodBuilder::new("check", "()V")
                .code(CodeBuilder::new().throw_new("java/lang/IllegalStateException")),
        )
        .method(
            MethodBuilder::new("run", "()V").code(
                CodeBuilder::new()
                    .aload(0)
                    .invokevirtual("p/Service", "check", "()V")
                    .return_(),
            ),
        )
        .method(
            MethodBuilder::new("guarded", "()V").code(
                CodeBuilder::new()
                    .aload(0)
                    .invokevirtual("p/Service", "check", "()V")
                    .return_()
                    .astore(1)
                    .return_()
                    .handler(0, 4, 5, Some("java/lang/RuntimeException")),
            ),
        );
    let child = ClassBuilder::class("p/ChildService").extends("p/Service");
    let caller = ClassBuilder::class("p/Caller").method(
        MethodBuilder::new("call", "(Lp/ChildService;)V").code(
            CodeBuilder::new()
                .aload(1)
                .invokevirtual("p/ChildService", "check", "()V")
                .return_(),
        ),
    );
    vec![service, child, caller]
}

#[test]
fn invoked_methods_propagate_unless_caught() {
    let results = extract(&service_classes(), ExtractOptions::default());

    assert_eq!(
        exceptions_of(&results, "p.Service", "run", "()V"),
        vec!["java.lang.IllegalStateException"]
    );
    assert!(exceptions_of(&results, "p.Service", "guarded", "()V").is_empty());
    // Resolved through the superclass of the referenced owner.
    assert_eq!(
        exceptions_of(&results, "p.Caller", "call", "(Lp/ChildService;)V"),
        vec!["java.lang.IllegalStateException"]
    );
}

#[test]
fn options_select_exception_sources() {
    let class = ClassBuilder::class("p/Subject")
        .method(MethodBuilder::new("declared", "()V").throws("java/io/IOException"))
        .method(
            MethodBuilder::new("thrown", "()V")
                .code(CodeBuilder::new().throw_new("java/lang/IllegalStateException")),
        )
        .method(
            MethodBuilder::new("calls", "()V").code(
                CodeBuilder::new()
                    .aload(0)
                    .invokevirtual("p/Subject", "declared", "()V")
                    .return_(),
            ),
        );

    let declared_only = ExtractOptions {
        declared: true,
        thrown: false,
        follow_invocations: false,
    };
    let results = extract(&[class.clone()], declared_only);
    assert_eq!(
        exceptions_of(&results, "p.Subject", "declared", "()V"),
        vec!["java.io.IOException"]
    );
    assert!(exceptions_of(&results, "p.Subject", "thrown", "()V").is_empty());
    assert!(exceptions_of(&results, "p.Subject", "calls", "()V").is_empty());

    let results = extract(&[class], ExtractOptions::default());
    assert_eq!(
        exceptions_of(&results, "p.Subject", "calls", "()V"),
        vec!["java.io.IOException"]
    );
}

#[test]
fn recursive_calls_reach_a_fixed_point() {
    let class = ClassBuilder::class("p/Subject")
        .method(
            MethodBuilder::new("even", "()V").code(
                CodeBuilder::new()
                    .aload(0)
                    .invokevirtual("p/Subject", "odd", "()V")
                    .return_(),
            ),
        )
        .method(
            MethodBuilder::new("odd", "()V").throws("p/Done").code(
                CodeBuilder::new()
                    .aload(0)
                    .invokevirtual("p/Subject", "even", "()V")
                    .aload(0)
                    .invokevirtual("p/Subject", "odd", "()V")
                    .return_(),
            ),
        );
    let results = extract(&[class], ExtractOptions::default());
    assert_eq!(exceptions_of(&results, "p.Subject", "even", "()V"), vec!["p.Done"]);
    assert_eq!(exceptions_of(&results, "p.Subject", "odd", "()V"), vec!["p.Done"]);
}
