use gs_loaders::{
  AggregationRules, AggregationStrategy, FieldMappingResolver, SectionRegistry, TransformFactory,
};

const SHIPPED_REGISTRY: &str = include_str!("../../../config/sections.json");

#[test]
fn test_shipped_registry_resolves_every_field() {
  let registry = SectionRegistry::from_json_str(SHIPPED_REGISTRY).unwrap();
  let declared: Vec<(String, usize)> =
    registry.sections.iter().map(|(key, section)| (key.clone(), section.fields.len())).collect();
  let resolver = FieldMappingResolver::new(registry, TransformFactory::default());

  for (key, count) in declared {
    let config = resolver.resolve(&key).unwrap();
    assert_eq!(config.len(), count, "section {} lost fields", key);
  }
}

#[test]
fn test_shipped_rules_precede_builtins() {
  let registry = SectionRegistry::from_json_str(SHIPPED_REGISTRY).unwrap();
  let rules = AggregationRules::default().with_rules_first(registry.aggregation);

  assert_eq!(rules.select("educacion", "nivel_educativo"), &AggregationStrategy::Flatten);
  assert!(matches!(
    rules.select("demografia", "poblacion_sexo"),
    AggregationStrategy::SumFields { .. }
  ));
  assert_eq!(rules.select("cultura", "religion"), &AggregationStrategy::MergeByKey);
}
