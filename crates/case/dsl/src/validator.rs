//! Validator: checks a parsed case before compilation
//!
//! Catches what the parser accepts but cannot be turned into a model:
//! unknown multiplicity spellings and OnPart sources that name neither a
//! case file item nor a plan item. Everything else is checked by the model
//! builder, with the positions the parser recorded.

use crate::errors::{DslError, DslResult};
use crate::parser::{ParsedCase, ParsedItem, ParsedOnPart, ParsedSentry};
use case_types::{CaseError, Multiplicity, SourceKind};
use std::collections::HashSet;

pub fn validate(case: &ParsedCase) -> DslResult<()> {
    if let Some(file_model) = &case.file_model {
        validate_multiplicities(&file_model.items)?;
    }
    validate_on_part_sources(case)?;
    Ok(())
}

fn validate_multiplicities(items: &[ParsedItem]) -> DslResult<()> {
    for item in items {
        parse_multiplicity(item)?;
        validate_multiplicities(&item.children)?;
    }
    Ok(())
}

fn validate_on_part_sources(case: &ParsedCase) -> DslResult<()> {
    let declared = Declared::collect(case);
    for sentry in &case.sentries {
        for on_part in &sentry.on_parts {
            declared.kind_of(sentry, on_part)?;
        }
    }
    Ok(())
}

pub(crate) fn parse_multiplicity(item: &ParsedItem) -> DslResult<Multiplicity> {
    Multiplicity::parse(&item.multiplicity).ok_or_else(|| DslError::UnknownMultiplicity {
        value: item.multiplicity.clone(),
        line: item.multiplicity_position.line,
        col: item.multiplicity_position.col,
    })
}

/// Ids an OnPart may refer to, by namespace
pub(crate) struct Declared<'a> {
    items: HashSet<&'a str>,
    plan_items: HashSet<&'a str>,
}

impl<'a> Declared<'a> {
    pub(crate) fn collect(case: &'a ParsedCase) -> Self {
        let mut items = HashSet::new();
        let mut stack: Vec<&ParsedItem> = case
            .file_model
            .iter()
            .flat_map(|model| model.items.iter())
            .collect();
        while let Some(item) = stack.pop() {
            items.insert(item.id.as_str());
            stack.extend(item.children.iter());
        }
        let plan_items = case.plan_items.iter().map(|p| p.id.as_str()).collect();
        Self { items, plan_items }
    }

    /// Case file items win over plan items; ids are unique across both once
    /// the model builds.
    pub(crate) fn kind_of(&self, sentry: &ParsedSentry, on_part: &ParsedOnPart) -> DslResult<SourceKind> {
        let source = on_part.source_ref.as_str();
        if self.items.contains(source) {
            Ok(SourceKind::CaseFileItem)
        } else if self.plan_items.contains(source) {
            Ok(SourceKind::PlanItem)
        } else {
            Err(CaseError::validation(
                &sentry.id,
                Some(on_part.position),
                format!("OnPart source '{source}' is neither a case file item nor a plan item"),
            )
            .into())
        }
    }
}
