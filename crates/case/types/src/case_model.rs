//! The CMMN case model: case file, sentries, criteria and plan items
//!
//! A model is assembled with [`CaseModelBuilder`] and validated once in
//! [`CaseModelBuilder::build`]. After that it is read-only; the only mutable
//! state of a running case lives in the sentry evaluator.

use crate::{CaseError, CaseResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ── Source positions ─────────────────────────────────────────────────

/// Where an element was declared in its source document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: usize,
    pub col: usize,
}

impl SourcePosition {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

// ── Case file ────────────────────────────────────────────────────────

/// How many case file items of one definition may exist under one parent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Multiplicity {
    ZeroOrOne,
    ExactlyOne,
    ZeroOrMore,
    OneOrMore,
}

impl Multiplicity {
    /// Accepts `ExactlyOne`, `EXACTLY_ONE` and `exactly_one` spellings.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized: String = text
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "zeroorone" => Some(Self::ZeroOrOne),
            "exactlyone" => Some(Self::ExactlyOne),
            "zeroormore" => Some(Self::ZeroOrMore),
            "oneormore" => Some(Self::OneOrMore),
            _ => None,
        }
    }

    pub fn admits(self, count: usize) -> bool {
        match self {
            Self::ZeroOrOne => count <= 1,
            Self::ExactlyOne => count == 1,
            Self::ZeroOrMore => true,
            Self::OneOrMore => count >= 1,
        }
    }
}

impl std::fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ZeroOrOne => "ZERO_OR_ONE",
            Self::ExactlyOne => "EXACTLY_ONE",
            Self::ZeroOrMore => "ZERO_OR_MORE",
            Self::OneOrMore => "ONE_OR_MORE",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseFileItem {
    pub id: String,
    pub name: Option<String>,
    pub multiplicity: Multiplicity,
    pub definition_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CaseFileItem>,
    pub position: Option<SourcePosition>,
}

impl CaseFileItem {
    pub fn new(id: impl Into<String>, multiplicity: Multiplicity) -> Self {
        Self {
            id: id.into(),
            name: None,
            multiplicity,
            definition_ref: None,
            children: Vec::new(),
            position: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_definition_ref(mut self, definition_ref: impl Into<String>) -> Self {
        self.definition_ref = Some(definition_ref.into());
        self
    }

    pub fn with_child(mut self, child: CaseFileItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    fn find(&self, id: &str) -> Option<&CaseFileItem> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseFileModel {
    pub id: String,
    pub items: Vec<CaseFileItem>,
    pub position: Option<SourcePosition>,
}

impl CaseFileModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
            position: None,
        }
    }

    pub fn with_item(mut self, item: CaseFileItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn find_item(&self, id: &str) -> Option<&CaseFileItem> {
        self.items.iter().find_map(|item| item.find(id))
    }
}

// ── Standard events ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaseFileItemTransition {
    Create,
    Update,
    Replace,
    Delete,
    AddChild,
    RemoveChild,
    AddReference,
    RemoveReference,
}

impl CaseFileItemTransition {
    pub const ALL: [CaseFileItemTransition; 8] = [
        Self::Create,
        Self::Update,
        Self::Replace,
        Self::Delete,
        Self::AddChild,
        Self::RemoveChild,
        Self::AddReference,
        Self::RemoveReference,
    ];

    pub fn standard_event(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::AddChild => "addChild",
            Self::RemoveChild => "removeChild",
            Self::AddReference => "addReference",
            Self::RemoveReference => "removeReference",
        }
    }

    pub fn from_standard_event(event: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.standard_event() == event)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanItemTransition {
    Create,
    Start,
    Complete,
    Terminate,
    Exit,
}

impl PlanItemTransition {
    pub const ALL: [PlanItemTransition; 5] = [
        Self::Create,
        Self::Start,
        Self::Complete,
        Self::Terminate,
        Self::Exit,
    ];

    pub fn standard_event(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Terminate => "terminate",
            Self::Exit => "exit",
        }
    }

    pub fn from_standard_event(event: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.standard_event() == event)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanItemState {
    #[default]
    Available,
    Active,
    Completed,
    Terminated,
}

impl PlanItemState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }
}

impl std::fmt::Display for PlanItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Available => "available",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

// ── Sentries and criteria ────────────────────────────────────────────

/// Which namespace an OnPart's source reference points into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    CaseFileItem,
    PlanItem,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CaseFileItem => write!(f, "case file item"),
            Self::PlanItem => write!(f, "plan item"),
        }
    }
}

/// One triggering condition of a sentry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OnPart {
    pub source_kind: SourceKind,
    pub source_ref: String,
    pub standard_event: String,
    pub position: Option<SourcePosition>,
}

impl OnPart {
    pub fn file_item(source_ref: impl Into<String>, standard_event: impl Into<String>) -> Self {
        Self {
            source_kind: SourceKind::CaseFileItem,
            source_ref: source_ref.into(),
            standard_event: standard_event.into(),
            position: None,
        }
    }

    pub fn plan_item(source_ref: impl Into<String>, standard_event: impl Into<String>) -> Self {
        Self {
            source_kind: SourceKind::PlanItem,
            source_ref: source_ref.into(),
            standard_event: standard_event.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn matches(&self, kind: SourceKind, source_id: &str, standard_event: &str) -> bool {
        self.source_kind == kind && self.source_ref == source_id && self.standard_event == standard_event
    }
}

/// AND-combination of OnParts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sentry {
    pub id: String,
    pub on_parts: Vec<OnPart>,
    pub position: Option<SourcePosition>,
}

impl Sentry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            on_parts: Vec::new(),
            position: None,
        }
    }

    pub fn with_on_part(mut self, on_part: OnPart) -> Self {
        self.on_parts.push(on_part);
        self
    }

    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    Entry,
    Exit,
}

/// A sentry attached to a plan item as entry or exit condition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub kind: CriterionKind,
    pub sentry_ref: String,
    pub position: Option<SourcePosition>,
}

impl Criterion {
    pub fn entry(id: impl Into<String>, sentry_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: CriterionKind::Entry,
            sentry_ref: sentry_ref.into(),
            position: None,
        }
    }

    pub fn exit(id: impl Into<String>, sentry_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: CriterionKind::Exit,
            sentry_ref: sentry_ref.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }
}

// ── Plan items ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    pub id: String,
    pub name: Option<String>,
    pub definition_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_criteria: Vec<Criterion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exit_criteria: Vec<Criterion>,
    pub position: Option<SourcePosition>,
}

impl PlanItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            definition_ref: None,
            entry_criteria: Vec::new(),
            exit_criteria: Vec::new(),
            position: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_definition_ref(mut self, definition_ref: impl Into<String>) -> Self {
        self.definition_ref = Some(definition_ref.into());
        self
    }

    /// Attach a criterion to the list matching its kind.
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        match criterion.kind {
            CriterionKind::Entry => self.entry_criteria.push(criterion),
            CriterionKind::Exit => self.exit_criteria.push(criterion),
        }
        self
    }

    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.entry_criteria.iter().chain(self.exit_criteria.iter())
    }
}

// ── Case model ───────────────────────────────────────────────────────

/// A validated, immutable case model
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CaseModel {
    pub id: String,
    pub name: Option<String>,
    pub file_model: Option<CaseFileModel>,
    pub sentries: Vec<Sentry>,
    pub plan_items: Vec<PlanItem>,
}

impl CaseModel {
    pub fn builder(id: impl Into<String>) -> CaseModelBuilder {
        CaseModelBuilder::new(id)
    }

    pub fn sentry(&self, id: &str) -> Option<&Sentry> {
        self.sentries.iter().find(|s| s.id == id)
    }

    pub fn plan_item(&self, id: &str) -> Option<&PlanItem> {
        self.plan_items.iter().find(|p| p.id == id)
    }

    pub fn case_file_item(&self, id: &str) -> Option<&CaseFileItem> {
        self.file_model.as_ref().and_then(|m| m.find_item(id))
    }

    /// Plan items and criteria that fire when the given sentry fires, in
    /// declaration order.
    pub fn criteria_for_sentry<'a>(
        &'a self,
        sentry_id: &'a str,
    ) -> impl Iterator<Item = (&'a PlanItem, &'a Criterion)> + 'a {
        self.plan_items.iter().flat_map(move |plan_item| {
            plan_item
                .criteria()
                .filter(move |c| c.sentry_ref == sentry_id)
                .map(move |c| (plan_item, c))
        })
    }
}

/// Assembles and validates a [`CaseModel`]
#[derive(Clone, Debug)]
pub struct CaseModelBuilder {
    id: String,
    name: Option<String>,
    file_model: Option<CaseFileModel>,
    sentries: Vec<Sentry>,
    plan_items: Vec<PlanItem>,
}

impl CaseModelBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            file_model: None,
            sentries: Vec::new(),
            plan_items: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn file_model(mut self, file_model: CaseFileModel) -> Self {
        self.file_model = Some(file_model);
        self
    }

    pub fn sentry(mut self, sentry: Sentry) -> Self {
        self.sentries.push(sentry);
        self
    }

    pub fn plan_item(mut self, plan_item: PlanItem) -> Self {
        self.plan_items.push(plan_item);
        self
    }

    /// Validate and freeze the model.
    ///
    /// Rejects duplicate element ids, case file siblings whose count per
    /// definition exceeds their multiplicity, sentries without OnParts,
    /// OnParts with unknown sources or events, and criteria referencing
    /// unknown sentries.
    pub fn build(self) -> CaseResult<CaseModel> {
        let model = CaseModel {
            id: self.id,
            name: self.name,
            file_model: self.file_model,
            sentries: self.sentries,
            plan_items: self.plan_items,
        };
        validate_unique_ids(&model)?;
        if let Some(file_model) = &model.file_model {
            validate_multiplicity(&file_model.id, &file_model.items)?;
        }
        validate_sentries(&model)?;
        validate_criteria(&model)?;
        Ok(model)
    }
}

fn validate_unique_ids(model: &CaseModel) -> CaseResult<()> {
    let mut declared: Vec<(&str, Option<SourcePosition>)> = vec![(model.id.as_str(), None)];
    if let Some(file_model) = &model.file_model {
        declared.push((file_model.id.as_str(), file_model.position));
        let mut stack: Vec<&CaseFileItem> = file_model.items.iter().collect();
        while let Some(item) = stack.pop() {
            declared.push((item.id.as_str(), item.position));
            stack.extend(item.children.iter());
        }
    }
    for sentry in &model.sentries {
        declared.push((sentry.id.as_str(), sentry.position));
    }
    for plan_item in &model.plan_items {
        declared.push((plan_item.id.as_str(), plan_item.position));
        for criterion in plan_item.criteria() {
            declared.push((criterion.id.as_str(), criterion.position));
        }
    }

    let mut seen = HashSet::new();
    for (id, position) in declared {
        if !seen.insert(id) {
            return Err(CaseError::validation(id, position, "duplicate element id"));
        }
    }
    Ok(())
}

/// Check every sibling list: siblings sharing a definitionRef are counted
/// together and the count must be admitted by each one's multiplicity.
fn validate_multiplicity(parent_id: &str, siblings: &[CaseFileItem]) -> CaseResult<()> {
    let mut groups: BTreeMap<&str, Vec<&CaseFileItem>> = BTreeMap::new();
    for item in siblings {
        let key = item.definition_ref.as_deref().unwrap_or(&item.id);
        groups.entry(key).or_default().push(item);
    }

    for (definition, items) in &groups {
        let count = items.len();
        for (index, item) in items.iter().enumerate() {
            if !item.multiplicity.admits(count) {
                // Blame the sibling that pushed the count over the bound.
                let offender = items.get(index.max(1)).copied().unwrap_or(*item);
                return Err(CaseError::validation(
                    &offender.id,
                    offender.position,
                    format!(
                        "{count} items under '{parent_id}' share definitionRef '{definition}' but multiplicity of '{}' is {}",
                        item.id, item.multiplicity
                    ),
                ));
            }
        }
    }

    for item in siblings {
        validate_multiplicity(&item.id, &item.children)?;
    }
    Ok(())
}

fn validate_sentries(model: &CaseModel) -> CaseResult<()> {
    for sentry in &model.sentries {
        if sentry.on_parts.is_empty() {
            return Err(CaseError::validation(
                &sentry.id,
                sentry.position,
                "sentry has no OnParts",
            ));
        }
        for on_part in &sentry.on_parts {
            let position = on_part.position.or(sentry.position);
            let (resolved, event_known) = match on_part.source_kind {
                SourceKind::CaseFileItem => (
                    model.case_file_item(&on_part.source_ref).is_some(),
                    CaseFileItemTransition::from_standard_event(&on_part.standard_event).is_some(),
                ),
                SourceKind::PlanItem => (
                    model.plan_item(&on_part.source_ref).is_some(),
                    PlanItemTransition::from_standard_event(&on_part.standard_event).is_some(),
                ),
            };
            if !resolved {
                return Err(CaseError::validation(
                    &sentry.id,
                    position,
                    format!(
                        "OnPart source '{}' is not a known {}",
                        on_part.source_ref, on_part.source_kind
                    ),
                ));
            }
            if !event_known {
                return Err(CaseError::validation(
                    &sentry.id,
                    position,
                    format!(
                        "'{}' is not a standard event of a {}",
                        on_part.standard_event, on_part.source_kind
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn validate_criteria(model: &CaseModel) -> CaseResult<()> {
    for plan_item in &model.plan_items {
        for criterion in plan_item.criteria() {
            if model.sentry(&criterion.sentry_ref).is_none() {
                return Err(CaseError::validation(
                    &criterion.id,
                    criterion.position.or(plan_item.position),
                    format!("criterion references unknown sentry '{}'", criterion.sentry_ref),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_model() -> CaseFileModel {
        CaseFileModel::new("CaseFileModel_1").with_item(
            CaseFileItem::new("fileItem1", Multiplicity::ExactlyOne)
                .with_name("File Item 1")
                .with_definition_ref("def1")
                .with_child(CaseFileItem::new("fileItem1_1", Multiplicity::ZeroOrMore)),
        )
    }

    #[test]
    fn test_build_resolves_file_item_sentry() {
        let model = CaseModel::builder("case1")
            .file_model(file_model())
            .sentry(Sentry::new("sentry1").with_on_part(OnPart::file_item("fileItem1", "addChild")))
            .plan_item(PlanItem::new("planItem1").with_criterion(Criterion::entry("c1", "sentry1")))
            .build()
            .unwrap();

        let item = model.case_file_item("fileItem1").unwrap();
        assert_eq!(item.multiplicity, Multiplicity::ExactlyOne);
        assert_eq!(item.definition_ref.as_deref(), Some("def1"));
        assert_eq!(item.children.len(), 1);
        assert!(model.case_file_item("fileItem1_1").is_some());

        let plan_item = model.plan_item("planItem1").unwrap();
        let sentry = model.sentry(&plan_item.entry_criteria[0].sentry_ref).unwrap();
        assert_eq!(sentry.on_parts[0].standard_event, "addChild");
        assert_eq!(sentry.on_parts[0].source_kind, SourceKind::CaseFileItem);
    }

    #[test]
    fn test_exactly_one_siblings_sharing_definition_rejected() {
        let file_model = CaseFileModel::new("fm")
            .with_item(CaseFileItem::new("a", Multiplicity::ExactlyOne).with_definition_ref("doc"))
            .with_item(
                CaseFileItem::new("b", Multiplicity::ExactlyOne)
                    .with_definition_ref("doc")
                    .at(SourcePosition::new(4, 3)),
            );
        let err = CaseModel::builder("case").file_model(file_model).build().unwrap_err();
        match err {
            CaseError::Validation {
                element_id,
                position,
                ..
            } => {
                assert_eq!(element_id, "b");
                assert_eq!(position, Some(SourcePosition::new(4, 3)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_multiplicity_checked() {
        let file_model = CaseFileModel::new("fm").with_item(
            CaseFileItem::new("root", Multiplicity::ExactlyOne)
                .with_child(CaseFileItem::new("x", Multiplicity::ZeroOrOne).with_definition_ref("d"))
                .with_child(CaseFileItem::new("y", Multiplicity::ZeroOrOne).with_definition_ref("d")),
        );
        assert!(CaseModel::builder("case").file_model(file_model).build().is_err());

        let ok = CaseFileModel::new("fm")
            .with_item(CaseFileItem::new("x", Multiplicity::ZeroOrMore).with_definition_ref("d"))
            .with_item(CaseFileItem::new("y", Multiplicity::OneOrMore).with_definition_ref("d"));
        assert!(CaseModel::builder("case").file_model(ok).build().is_ok());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = CaseModel::builder("case")
            .plan_item(PlanItem::new("p1"))
            .plan_item(PlanItem::new("p1"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate element id"));
    }

    #[test]
    fn test_sentry_without_on_parts_rejected() {
        let err = CaseModel::builder("case").sentry(Sentry::new("s1")).build().unwrap_err();
        assert!(matches!(err, CaseError::Validation { .. }));
    }

    #[test]
    fn test_unknown_references_rejected() {
        let missing_source = CaseModel::builder("case")
            .sentry(Sentry::new("s1").with_on_part(OnPart::plan_item("ghost", "complete")))
            .build();
        assert!(missing_source.is_err());

        let bad_event = CaseModel::builder("case")
            .plan_item(PlanItem::new("p1"))
            .sentry(Sentry::new("s1").with_on_part(OnPart::plan_item("p1", "addChild")))
            .build();
        assert!(bad_event.is_err());

        let missing_sentry = CaseModel::builder("case")
            .plan_item(PlanItem::new("p1").with_criterion(Criterion::exit("c1", "nope")))
            .build();
        assert!(missing_sentry.is_err());
    }

    #[test]
    fn test_criteria_for_sentry_in_declaration_order() {
        let model = CaseModel::builder("case")
            .plan_item(PlanItem::new("a"))
            .sentry(Sentry::new("s").with_on_part(OnPart::plan_item("a", "complete")))
            .plan_item(PlanItem::new("b").with_criterion(Criterion::entry("cb", "s")))
            .plan_item(PlanItem::new("c").with_criterion(Criterion::exit("cc", "s")))
            .build()
            .unwrap();
        let hits: Vec<_> = model
            .criteria_for_sentry("s")
            .map(|(p, c)| (p.id.as_str(), c.kind))
            .collect();
        assert_eq!(hits, vec![("b", CriterionKind::Entry), ("c", CriterionKind::Exit)]);
    }

    #[test]
    fn test_multiplicity_parse_and_admits() {
        assert_eq!(Multiplicity::parse("EXACTLY_ONE"), Some(Multiplicity::ExactlyOne));
        assert_eq!(Multiplicity::parse("ZeroOrMore"), Some(Multiplicity::ZeroOrMore));
        assert_eq!(Multiplicity::parse("one_or_more"), Some(Multiplicity::OneOrMore));
        assert_eq!(Multiplicity::parse("many"), None);
        assert!(Multiplicity::ZeroOrOne.admits(0));
        assert!(!Multiplicity::ZeroOrOne.admits(2));
        assert!(!Multiplicity::OneOrMore.admits(0));
    }

    #[test]
    fn test_standard_event_names() {
        assert_eq!(
            CaseFileItemTransition::from_standard_event("addChild"),
            Some(CaseFileItemTransition::AddChild)
        );
        assert_eq!(PlanItemTransition::Exit.standard_event(), "exit");
        assert_eq!(PlanItemTransition::from_standard_event("addChild"), None);
    }
}
