//! The validated field registry.
//!
//! Built once per process from a descriptor table and shared read-only
//! (`Arc<FieldRegistry>`) by every entity.

use super::descriptor::FieldDescriptor;
use super::errors::{DependencyKind, SchemaError, UnknownFieldError};
use super::index::DependencyIndex;
use crate::ports::EntityContext;
use std::collections::HashMap;
use tracing::debug;

/// Field descriptors plus their dependency index.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<FieldDescriptor>,
    by_name: HashMap<String, usize>,
    index: DependencyIndex,
}

impl FieldRegistry {
    /// Validate `descriptors` and derive the dependency index.
    ///
    /// `value_field` / `visibility_field` may name a field or an alias; they
    /// are rewritten to the canonical name.
    pub fn build<I>(descriptors: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = FieldDescriptor>,
    {
        let mut fields: Vec<FieldDescriptor> = descriptors.into_iter().collect();

        let mut by_name = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter_mut().enumerate() {
            field.normalize_names();
            if by_name.insert(field.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }

        let mut aliases: HashMap<String, String> = HashMap::new();
        for field in &fields {
            if field.internal_name == field.name {
                continue;
            }
            let collision = by_name
                .get(&field.internal_name)
                .map(|&other| fields[other].name.clone())
                .or_else(|| aliases.get(&field.internal_name).cloned());
            if let Some(other) = collision {
                return Err(SchemaError::AliasCollision {
                    alias: field.internal_name.clone(),
                    field: field.name.clone(),
                    other,
                });
            }
            aliases.insert(field.internal_name.clone(), field.name.clone());
        }

        let canonical = |target: &str| -> Option<String> {
            if by_name.contains_key(target) {
                Some(target.to_string())
            } else {
                aliases.get(target).cloned()
            }
        };
        for field in &mut fields {
            for kind in [DependencyKind::Value, DependencyKind::Visibility] {
                let link = match kind {
                    DependencyKind::Value => &mut field.value_field,
                    DependencyKind::Visibility => &mut field.visibility_field,
                };
                let Some(target) = link.as_ref() else {
                    continue;
                };
                let Some(resolved) = canonical(target) else {
                    return Err(SchemaError::DanglingReference {
                        field: field.name.clone(),
                        kind,
                        target: target.clone(),
                    });
                };
                if resolved == field.name {
                    return Err(SchemaError::SelfReference {
                        field: field.name.clone(),
                        kind,
                    });
                }
                *link = Some(resolved);
            }
        }

        let order = topological_order(&fields, &by_name)?;

        let mut index = DependencyIndex {
            aliases,
            order,
            ..DependencyIndex::default()
        };
        for field in &fields {
            if let Some(parent) = &field.value_field {
                index
                    .choice_dependents
                    .entry(parent.clone())
                    .or_default()
                    .push(field.name.clone());
            }
            if let Some(parent) = &field.visibility_field {
                index
                    .visibility_dependents
                    .entry(parent.clone())
                    .or_default()
                    .push(field.name.clone());
            }
        }

        debug!(
            fields = fields.len(),
            aliases = index.aliases.len(),
            "Field registry built"
        );
        Ok(Self {
            fields,
            by_name,
            index,
        })
    }

    /// Look up a field by name or alias.
    pub fn resolve(&self, name: &str) -> Result<&FieldDescriptor, UnknownFieldError> {
        self.get(name).ok_or_else(|| UnknownFieldError::new(name))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        let canonical = self.canonical_name(name)?;
        self.by_name.get(canonical).map(|&i| &self.fields[i])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.canonical_name(name).is_some()
    }

    /// The stable name for `name`, which may be an alias.
    #[must_use]
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.by_name.contains_key(name) {
            Some(name)
        } else {
            self.index.alias_target(name)
        }
    }

    /// Fields whose choices depend on `name`.
    #[must_use]
    pub fn choice_dependents(&self, name: &str) -> &[String] {
        match self.canonical_name(name) {
            Some(canonical) => self.index.choice_dependents(canonical),
            None => &[],
        }
    }

    /// Fields whose visibility depends on `name`.
    #[must_use]
    pub fn visibility_dependents(&self, name: &str) -> &[String] {
        match self.canonical_name(name) {
            Some(canonical) => self.index.visibility_dependents(canonical),
            None => &[],
        }
    }

    /// Every field name, each after the fields it depends on.
    #[must_use]
    pub fn topological_order(&self) -> &[String] {
        self.index.topological_order()
    }

    #[must_use]
    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    /// All descriptors in registry order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Descriptors marked mandatory, in registry order.
    #[must_use]
    pub fn required_fields(&self) -> Vec<&FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_mandatory).collect()
    }

    /// True only if `field` is marked mandatory, visible in `context`, and
    /// has more than one legal choice there. Fields without a value list
    /// count as having unbounded choices.
    pub fn is_mandatory<C>(&self, field: &str, context: &C) -> Result<bool, UnknownFieldError>
    where
        C: EntityContext + ?Sized,
    {
        let descriptor = self.resolve(field)?;
        if !descriptor.is_mandatory || !context.is_visible(&descriptor.name)? {
            return Ok(false);
        }
        if !descriptor.has_values() {
            return Ok(true);
        }
        Ok(context.choices(&descriptor.name)?.len() > 1)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first over "depends on" links; parents land before dependents.
fn topological_order(
    fields: &[FieldDescriptor],
    by_name: &HashMap<String, usize>,
) -> Result<Vec<String>, SchemaError> {
    let mut marks = vec![Mark::Unvisited; fields.len()];
    let mut path = Vec::new();
    let mut order = Vec::with_capacity(fields.len());
    for start in 0..fields.len() {
        visit(start, fields, by_name, &mut marks, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit(
    current: usize,
    fields: &[FieldDescriptor],
    by_name: &HashMap<String, usize>,
    marks: &mut [Mark],
    path: &mut Vec<usize>,
    order: &mut Vec<String>,
) -> Result<(), SchemaError> {
    match marks[current] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            let from = path.iter().position(|&p| p == current).unwrap_or(0);
            let mut cycle: Vec<String> = path[from..]
                .iter()
                .map(|&p| fields[p].name.clone())
                .collect();
            cycle.push(fields[current].name.clone());
            return Err(SchemaError::DependencyCycle { path: cycle });
        }
        Mark::Unvisited => {}
    }

    marks[current] = Mark::InProgress;
    path.push(current);
    let field = &fields[current];
    let parents = field.value_field.iter().chain(field.visibility_field.iter());
    for parent in parents {
        if let Some(&p) = by_name.get(parent) {
            visit(p, fields, by_name, marks, path, order)?;
        }
    }
    path.pop();
    marks[current] = Mark::Done;
    order.push(field.name.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldOption, FieldType};

    fn select(name: &str) -> FieldDescriptor {
        FieldDescriptor::new(name, FieldType::Select)
    }

    fn tracker() -> Vec<FieldDescriptor> {
        vec![
            select("component")
                .value_field("product")
                .mandatory()
                .options([
                    FieldOption::new("Engine").visible_for(["Core"]),
                    FieldOption::new("Widgets").visible_for(["UI"]),
                ]),
            select("product").mandatory().options([FieldOption::new("Core"), FieldOption::new("UI")]),
            select("severity").internal_name("bug_severity"),
            FieldDescriptor::new("target", FieldType::String).visibility_field("bug_severity", ["blocker"]),
            FieldDescriptor::new("summary", FieldType::String).mandatory(),
        ]
    }

    #[test]
    fn test_build_valid_registry() {
        let registry = FieldRegistry::build(tracker()).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.choice_dependents("product"), ["component".to_string()]);
        assert!(registry.choice_dependents("summary").is_empty());
        assert_eq!(registry.visibility_dependents("severity"), ["target".to_string()]);
        assert_eq!(registry.visibility_dependents("bug_severity"), ["target".to_string()]);
    }

    #[test]
    fn test_alias_resolution() {
        let registry = FieldRegistry::build(tracker()).unwrap();
        assert_eq!(registry.resolve("bug_severity").unwrap().name, "severity");
        assert_eq!(registry.canonical_name("severity"), Some("severity"));
        assert_eq!(registry.canonical_name("bug_severity"), Some("severity"));
        assert_eq!(
            registry.resolve("nope").unwrap_err(),
            UnknownFieldError::new("nope")
        );
    }

    #[test]
    fn test_references_are_canonicalized() {
        let registry = FieldRegistry::build(tracker()).unwrap();
        assert_eq!(
            registry.resolve("target").unwrap().visibility_field.as_deref(),
            Some("severity")
        );
    }

    #[test]
    fn test_topological_order_puts_parents_first() {
        let registry = FieldRegistry::build(tracker()).unwrap();
        let order = registry.topological_order();
        let pos = |n: &str| order.iter().position(|o| o == n).unwrap();
        assert_eq!(order.len(), 5);
        assert!(pos("product") < pos("component"));
        assert!(pos("severity") < pos("target"));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = FieldRegistry::build(vec![select("a"), select("a")]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField("a".into()));
    }

    #[test]
    fn test_alias_collision_rejected() {
        let err = FieldRegistry::build(vec![select("status"), select("state").internal_name("status")])
            .unwrap_err();
        assert!(matches!(err, SchemaError::AliasCollision { ref alias, .. } if alias == "status"));

        let err = FieldRegistry::build(vec![
            select("a").internal_name("x"),
            select("b").internal_name("x"),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::AliasCollision { ref other, .. } if other == "a"));
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let err = FieldRegistry::build(vec![select("component").value_field("product")]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DanglingReference {
                field: "component".into(),
                kind: DependencyKind::Value,
                target: "product".into(),
            }
        );
    }

    #[test]
    fn test_self_reference_rejected() {
        let err = FieldRegistry::build(vec![select("a").visibility_field("a", ["x"])]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::SelfReference {
                field: "a".into(),
                kind: DependencyKind::Visibility,
            }
        );
    }

    #[test]
    fn test_cycle_rejected_with_path() {
        let err = FieldRegistry::build(vec![
            select("a").value_field("b"),
            select("b").visibility_field("c", ["on"]),
            select("c").value_field("a"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DependencyCycle {
                path: vec!["a".into(), "b".into(), "c".into(), "a".into()],
            }
        );
    }

    #[test]
    fn test_required_fields() {
        let registry = FieldRegistry::build(tracker()).unwrap();
        let names: Vec<_> = registry.required_fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["component", "product", "summary"]);
    }

    struct FixedContext {
        visible: bool,
        choices: Vec<String>,
    }

    impl EntityContext for FixedContext {
        fn is_visible(&self, _field: &str) -> Result<bool, UnknownFieldError> {
            Ok(self.visible)
        }

        fn choices(&self, _field: &str) -> Result<Vec<String>, UnknownFieldError> {
            Ok(self.choices.clone())
        }
    }

    #[test]
    fn test_is_mandatory_rules() {
        let registry = FieldRegistry::build(tracker()).unwrap();
        let two = FixedContext {
            visible: true,
            choices: vec!["Core".into(), "UI".into()],
        };
        let one = FixedContext {
            visible: true,
            choices: vec!["Core".into()],
        };
        let hidden = FixedContext {
            visible: false,
            choices: vec!["Core".into(), "UI".into()],
        };

        assert!(registry.is_mandatory("product", &two).unwrap());
        assert!(!registry.is_mandatory("product", &one).unwrap());
        assert!(!registry.is_mandatory("product", &hidden).unwrap());
        assert!(!registry.is_mandatory("severity", &two).unwrap());
        // free text: unbounded choices
        assert!(registry.is_mandatory("summary", &one).unwrap());
        assert!(registry.is_mandatory("bogus", &two).is_err());
    }
}
