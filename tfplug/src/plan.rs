//! Planned state computation for `PlanResourceChange`
//!
//! Terraform proposes a new state by merging configuration with prior state.
//! The provider then fills in defaults, marks computed values it cannot
//! predict as unknown, and runs attribute plan modifiers.

use crate::defaults::DefaultRequest;
use crate::plan_modifier::{values_equal, PlanModifyRequest};
use crate::schema::{Attribute, NestingMode, Schema};
use crate::types::{AttributePath, Diagnostics, Dynamic};
use std::collections::{BTreeMap, HashMap};

pub struct PlanResult {
    /// `None` plans the destruction of the resource
    pub planned_state: Option<HashMap<String, Dynamic>>,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Diagnostics,
}

pub fn plan_resource_change(
    schema: &Schema,
    prior_state: Option<&HashMap<String, Dynamic>>,
    proposed_new_state: Option<HashMap<String, Dynamic>>,
    config: &HashMap<String, Dynamic>,
) -> PlanResult {
    let mut result = PlanResult {
        planned_state: None,
        requires_replace: Vec::new(),
        diagnostics: Diagnostics::new(),
    };

    let Some(mut planned) = proposed_new_state else {
        return result;
    };

    apply_defaults(&schema.attributes, &mut planned, config);
    mark_computed_unknown(&schema.attributes, &mut planned, config, prior_state);

    for (name, attr) in &schema.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }

        let state_value = prior_state
            .and_then(|prior| prior.get(name))
            .cloned()
            .unwrap_or(Dynamic::Null);
        let config_value = config.get(name).cloned().unwrap_or(Dynamic::Null);
        let mut plan_value = planned.get(name).cloned().unwrap_or(Dynamic::Null);

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify_plan(PlanModifyRequest {
                state: state_value.clone(),
                plan: plan_value,
                config: config_value.clone(),
                attribute_path: name.clone(),
            });
            plan_value = response.plan_value;
            result.diagnostics.extend(response.diagnostics);

            // Replacement is meaningless while creating
            if response.requires_replace && prior_state.is_some() {
                let path = AttributePath::new(name);
                if !result.requires_replace.contains(&path) {
                    result.requires_replace.push(path);
                }
            }
        }

        planned.insert(name.clone(), plan_value);
    }

    schema.normalize(&mut planned);
    result.planned_state = Some(planned);
    result
}

fn apply_defaults(
    attributes: &BTreeMap<String, Attribute>,
    planned: &mut HashMap<String, Dynamic>,
    config: &HashMap<String, Dynamic>,
) {
    let empty = HashMap::new();

    for (name, attr) in attributes {
        let config_value = config.get(name).unwrap_or(&Dynamic::Null);

        if config_value.is_null() && attr.optional && attr.computed {
            if let Some(default) = &attr.default {
                let response = default.default_value(DefaultRequest {
                    attribute_path: name.clone(),
                });
                planned.insert(name.clone(), response.value);
                continue;
            }
        }

        if let (Some(nested), Some(planned_value)) = (&attr.nested, planned.get_mut(name)) {
            for_each_nested(nested.nesting, planned_value, config_value, None, |object, cfg, _| {
                apply_defaults(&nested.attributes, object, cfg.unwrap_or(&empty))
            });
        }
    }
}

fn mark_computed_unknown(
    attributes: &BTreeMap<String, Attribute>,
    planned: &mut HashMap<String, Dynamic>,
    config: &HashMap<String, Dynamic>,
    prior: Option<&HashMap<String, Dynamic>>,
) {
    let changed = prior.map_or(true, |prior| {
        !values_equal(&Dynamic::Map(planned.clone()), &Dynamic::Map(prior.clone()))
    });
    let empty = HashMap::new();

    for (name, attr) in attributes {
        let config_value = config.get(name).unwrap_or(&Dynamic::Null);

        if config_value.is_null() && attr.computed {
            let has_default = attr.optional && attr.default.is_some();
            if changed && !has_default {
                planned.insert(name.clone(), Dynamic::Unknown);
            }
            continue;
        }

        if let (Some(nested), Some(planned_value)) = (&attr.nested, planned.get_mut(name)) {
            let prior_value = prior.and_then(|prior| prior.get(name));
            for_each_nested(
                nested.nesting,
                planned_value,
                config_value,
                prior_value,
                |object, cfg, prior_object| {
                    mark_computed_unknown(
                        &nested.attributes,
                        object,
                        cfg.unwrap_or(&empty),
                        prior_object,
                    )
                },
            );
        }
    }
}

type NestedVisit<'a> = (
    &'a mut HashMap<String, Dynamic>,
    Option<&'a HashMap<String, Dynamic>>,
    Option<&'a HashMap<String, Dynamic>>,
);

/// Visits each object of a nested attribute together with the config and
/// prior objects at the same position.
fn for_each_nested<'a, F>(
    nesting: NestingMode,
    planned: &'a mut Dynamic,
    config: &'a Dynamic,
    prior: Option<&'a Dynamic>,
    mut f: F,
) where
    F: FnMut(
        &mut HashMap<String, Dynamic>,
        Option<&HashMap<String, Dynamic>>,
        Option<&HashMap<String, Dynamic>>,
    ),
{
    let visits: Vec<NestedVisit<'a>> = match (nesting, planned) {
        (NestingMode::Single, Dynamic::Map(object)) => {
            vec![(object, config.as_map(), prior.and_then(Dynamic::as_map))]
        }
        (NestingMode::List | NestingMode::Set, Dynamic::List(items)) => items
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, item)| match item {
                Dynamic::Map(object) => Some((
                    object,
                    config
                        .as_list()
                        .and_then(|list| list.get(idx))
                        .and_then(Dynamic::as_map),
                    prior
                        .and_then(Dynamic::as_list)
                        .and_then(|list| list.get(idx))
                        .and_then(Dynamic::as_map),
                )),
                _ => None,
            })
            .collect(),
        (NestingMode::Map, Dynamic::Map(entries)) => entries
            .iter_mut()
            .filter_map(|(key, item)| match item {
                Dynamic::Map(object) => Some((
                    object,
                    config
                        .as_map()
                        .and_then(|map| map.get(key))
                        .and_then(Dynamic::as_map),
                    prior
                        .and_then(Dynamic::as_map)
                        .and_then(|map| map.get(key))
                        .and_then(Dynamic::as_map),
                )),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    for (object, config_object, prior_object) in visits {
        f(object, config_object, prior_object);
    }
}
