//! Compiling complete case models and the diagnostics for broken ones.

use case_dsl::{compile, DslError};
use case_types::{CaseError, Multiplicity, SourceKind, SourcePosition};

const CLAIMS: &str = r#"
CASE claims "Claims handling" {
    FILEMODEL files {
        ITEM claim "Claim" EXACTLY_ONE
        ITEM evidence ZERO_OR_MORE DEFINITION document {
            ITEM page ONE_OR_MORE
        }
    }

    SENTRY ready {
        ON claim create
        ON evidence addChild
    }
    SENTRY reviewed {
        ON review complete
    }
    SENTRY withdrawn {
        ON claim delete
    }

    PLANITEM review "Review claim" {
        ENTRY review_entry ready
        EXIT review_exit withdrawn
    }
    PLANITEM payout {
        ENTRY payout_entry reviewed
    }
}
"#;

#[test]
fn claims_model_compiles() {
    let model = compile(CLAIMS).unwrap();

    assert_eq!(model.name.as_deref(), Some("Claims handling"));
    assert_eq!(model.sentries.len(), 3);
    assert_eq!(model.plan_items.len(), 2);

    let page = model.case_file_item("page").unwrap();
    assert_eq!(page.multiplicity, Multiplicity::OneOrMore);
    assert_eq!(page.position, Some(SourcePosition::new(6, 13)));

    let reviewed = model.sentry("reviewed").unwrap();
    assert_eq!(reviewed.on_parts[0].source_kind, SourceKind::PlanItem);

    let review = model.plan_item("review").unwrap();
    assert_eq!(review.entry_criteria.len(), 1);
    assert_eq!(review.exit_criteria.len(), 1);
}

#[test]
fn model_serializes_with_positions() {
    let model = compile(CLAIMS).unwrap();
    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(json["sentries"][0]["on_parts"][1]["standard_event"], "addChild");
    assert_eq!(json["sentries"][0]["position"]["line"], 10);
}

#[test]
fn exactly_one_siblings_sharing_definition_fail_with_position() {
    let source = r#"
CASE c {
    FILEMODEL files {
        ITEM first EXACTLY_ONE DEFINITION shared
        ITEM second EXACTLY_ONE DEFINITION shared
    }
}
"#;
    let err = compile(source).unwrap_err();
    match err {
        DslError::CaseError(CaseError::Validation {
            element_id,
            position,
            ..
        }) => {
            assert_eq!(element_id, "second");
            assert_eq!(position, Some(SourcePosition::new(5, 9)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_ids_across_namespaces_rejected() {
    let source = "CASE c { FILEMODEL f { ITEM x ZERO_OR_ONE } PLANITEM x }";
    let err = compile(source).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("duplicate element id"));
}

#[test]
fn sentry_without_on_parts_rejected() {
    let err = compile("CASE c { SENTRY empty { } }").unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("line 1, column 10"));
}

#[test]
fn syntax_errors_point_at_token() {
    let err = compile("CASE c {\n    ITEM x ZERO_OR_ONE\n}").unwrap_err();
    assert!(matches!(err, DslError::UnknownKeyword { line: 2, col: 5, .. }));
}
