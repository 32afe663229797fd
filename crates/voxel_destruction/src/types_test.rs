use super::*;

#[test]
fn test_direction_opposites() {
  for dir in Direction::ALL {
    assert_eq!(dir.opposite().opposite(), dir);
    assert_eq!(dir.opposite().axis(), dir.axis());
    assert_ne!(dir.opposite().is_positive(), dir.is_positive());
    assert_eq!(dir.offset(), -dir.opposite().offset());
  }
}

#[test]
fn test_direction_order_matches_offsets() {
  assert_eq!(Direction::NegX.offset(), IVec3::new(-1, 0, 0));
  assert_eq!(Direction::PosZ.offset(), IVec3::new(0, 0, 1));
  assert_eq!(Direction::PosY.index(), 3);
}

#[test]
fn test_config_builder() {
  let config = DestructionConfig::new()
    .with_sub_cell_division(4)
    .with_supercell_size(8)
    .with_narrow_phase(true)
    .with_resolution(DestructionResolution::Cell);

  assert_eq!(config.sub_cell_division, 4);
  assert_eq!(config.supercell_size, 8);
  assert!(config.enable_narrow_phase);
  assert_eq!(config.resolution, DestructionResolution::Cell);
  assert!(config.validate().is_ok());
}

#[test]
fn test_config_rejects_out_of_range_division() {
  assert!(DestructionConfig::new()
    .with_sub_cell_division(0)
    .validate()
    .is_err());
  assert!(DestructionConfig::new()
    .with_sub_cell_division(9)
    .validate()
    .is_err());
}

#[test]
fn test_config_rejects_negative_speed() {
  let err = DestructionConfig::new()
    .with_debris_base_speed(-1.0)
    .validate()
    .unwrap_err();
  assert!(matches!(err, DestructionError::InvalidConfig(_)));
}

#[test]
fn test_config_deserializes_with_defaults() {
  let config: DestructionConfig =
    serde_json::from_str(r#"{ "supercell_size": 6, "resolution": "Cell" }"#).unwrap();
  assert_eq!(config.supercell_size, 6);
  assert_eq!(config.resolution, DestructionResolution::Cell);
  assert_eq!(config.sub_cell_division, DEFAULT_SUB_CELL_DIVISION);
}
