//! Compiler: turns a validated [`ParsedCase`] into a [`CaseModel`]
//!
//! OnPart sources are resolved to a case file item or a plan item by id.
//! Structural validation (unique ids, multiplicity, standard events,
//! criterion targets) is left to the model builder, which reports the
//! source positions carried over from the parser.

use crate::errors::DslResult;
use crate::parser::{ParsedCase, ParsedItem, ParsedPlanItem, ParsedSentry, Parser};
use crate::validator::{self, parse_multiplicity, Declared};
use case_types::{
    CaseFileItem, CaseFileModel, CaseModel, Criterion, CriterionKind, OnPart, PlanItem, Sentry,
    SourceKind,
};
use tracing::debug;

/// Compile case model text directly into a [`CaseModel`]
pub fn compile(input: &str) -> DslResult<CaseModel> {
    let parsed = Parser::parse(input)?;
    validator::validate(&parsed)?;
    compile_parsed(&parsed)
}

/// Compile a pre-parsed case into a [`CaseModel`]
pub fn compile_parsed(parsed: &ParsedCase) -> DslResult<CaseModel> {
    let declared = Declared::collect(parsed);
    let mut builder = CaseModel::builder(&parsed.id);
    if let Some(name) = &parsed.name {
        builder = builder.name(name);
    }

    if let Some(file_model) = &parsed.file_model {
        let mut model = CaseFileModel::new(&file_model.id).at(file_model.position);
        for item in &file_model.items {
            model = model.with_item(compile_item(item)?);
        }
        builder = builder.file_model(model);
    }

    for sentry in &parsed.sentries {
        builder = builder.sentry(compile_sentry(&declared, sentry)?);
    }
    for plan_item in &parsed.plan_items {
        builder = builder.plan_item(compile_plan_item(plan_item));
    }

    let model = builder.build()?;
    debug!(
        case_id = %model.id,
        sentries = model.sentries.len(),
        plan_items = model.plan_items.len(),
        "Case model compiled"
    );
    Ok(model)
}

fn compile_item(item: &ParsedItem) -> DslResult<CaseFileItem> {
    let mut compiled = CaseFileItem::new(&item.id, parse_multiplicity(item)?).at(item.position);
    if let Some(name) = &item.name {
        compiled = compiled.with_name(name);
    }
    if let Some(definition_ref) = &item.definition_ref {
        compiled = compiled.with_definition_ref(definition_ref);
    }
    for child in &item.children {
        compiled = compiled.with_child(compile_item(child)?);
    }
    Ok(compiled)
}

fn compile_sentry(declared: &Declared<'_>, sentry: &ParsedSentry) -> DslResult<Sentry> {
    let mut compiled = Sentry::new(&sentry.id).at(sentry.position);
    for on_part in &sentry.on_parts {
        let part = match declared.kind_of(sentry, on_part)? {
            SourceKind::CaseFileItem => OnPart::file_item(&on_part.source_ref, &on_part.standard_event),
            SourceKind::PlanItem => OnPart::plan_item(&on_part.source_ref, &on_part.standard_event),
        };
        compiled = compiled.with_on_part(part.at(on_part.position));
    }
    Ok(compiled)
}

fn compile_plan_item(plan_item: &ParsedPlanItem) -> PlanItem {
    let mut compiled = PlanItem::new(&plan_item.id).at(plan_item.position);
    if let Some(name) = &plan_item.name {
        compiled = compiled.with_name(name);
    }
    if let Some(definition_ref) = &plan_item.definition_ref {
        compiled = compiled.with_definition_ref(definition_ref);
    }
    for criterion in &plan_item.criteria {
        let compiled_criterion = match criterion.kind {
            CriterionKind::Entry => Criterion::entry(&criterion.id, &criterion.sentry_ref),
            CriterionKind::Exit => Criterion::exit(&criterion.id, &criterion.sentry_ref),
        };
        compiled = compiled.with_criterion(compiled_criterion.at(criterion.position));
    }
    compiled
}
