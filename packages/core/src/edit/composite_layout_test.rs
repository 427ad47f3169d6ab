//! Tests for CompositeLayout re-flow rules

#[cfg(test)]
mod tests {
    use crate::edit::{
        CompositeLayout, CompositeLayoutError, DeleteMode, DragEligibility, DropOutcome,
        DropTarget,
    };
    use crate::models::{CompositeSubobject, ObjectId};
    use proptest::prelude::*;

    /// Build a layout from columns of ids, top to bottom
    fn layout(columns: &[&[ObjectId]]) -> CompositeLayout {
        let subobjects: Vec<CompositeSubobject> = columns
            .iter()
            .enumerate()
            .flat_map(|(column, ids)| {
                ids.iter()
                    .enumerate()
                    .map(move |(row, id)| CompositeSubobject::new(*id, column, row))
            })
            .collect();
        CompositeLayout::from_subobjects(&subobjects)
    }

    fn grid(layout: &CompositeLayout) -> Vec<Vec<ObjectId>> {
        (0..layout.column_count())
            .map(|c| layout.column_ids(c))
            .collect()
    }

    // =========================================================================
    // Construction
    // =========================================================================

    #[test]
    fn test_from_subobjects_normalizes_gaps() {
        let layout = CompositeLayout::from_subobjects(&[
            CompositeSubobject::new(1, 0, 3),
            CompositeSubobject::new(2, 0, 7),
            CompositeSubobject::new(3, 4, 1),
        ]);
        assert_eq!(grid(&layout), vec![vec![1, 2], vec![3]]);
        assert!(layout.is_compact());
    }

    #[test]
    fn test_from_subobjects_keeps_display_parameters() {
        let mut subobject = CompositeSubobject::new(5, 0, 0);
        subobject.is_expanded = false;
        subobject.selected_tab = 2;
        let layout = CompositeLayout::from_subobjects(&[subobject]);

        let position = layout.position(5).unwrap();
        assert!(!position.expanded);
        assert_eq!(position.selected_tab, 2);
        assert_eq!(position.delete_mode, DeleteMode::None);
    }

    // =========================================================================
    // Adding subobjects
    // =========================================================================

    #[test]
    fn test_add_new_subobject_on_empty_layout_creates_column_zero() {
        let mut layout = CompositeLayout::new();
        let id = layout.add_new_subobject();
        assert_eq!(id, -1);
        let position = layout.position(id).unwrap();
        assert_eq!((position.column, position.row), (0, 0));
    }

    #[test]
    fn test_add_new_subobject_appends_to_last_column() {
        let mut layout = layout(&[&[1, 2], &[3]]);
        let first = layout.add_new_subobject();
        let second = layout.add_new_subobject();
        assert_eq!((first, second), (-1, -2));
        assert_eq!(grid(&layout), vec![vec![1, 2], vec![3, -1, -2]]);
    }

    #[test]
    fn test_add_existing_subobject_flags_composites() {
        let mut layout = layout(&[&[1]]);
        let position = layout.add_existing_subobject(9, true).unwrap();
        assert_eq!((position.column, position.row), (0, 1));
        assert!(position.is_composite);

        assert_eq!(
            layout.add_existing_subobject(9, false).unwrap_err(),
            CompositeLayoutError::DuplicateSubobject { subobject_id: 9 }
        );
    }

    #[test]
    fn test_add_new_subobject_as_rejects_duplicates() {
        let mut layout = layout(&[&[1], &[2]]);
        layout.add_new_subobject_as(-7).unwrap();
        assert_eq!(grid(&layout), vec![vec![1], vec![2, -7]]);
        assert_eq!(
            layout.add_new_subobject_as(-7),
            Err(CompositeLayoutError::DuplicateSubobject { subobject_id: -7 })
        );
    }

    #[test]
    fn test_rekey_keeps_slot_and_state() {
        let mut layout = layout(&[&[-1, 2]]);
        layout.toggle_expanded(-1).unwrap();

        layout.rekey(-1, -3).unwrap();

        assert_eq!(grid(&layout), vec![vec![-3, 2]]);
        assert!(!layout.position(-3).unwrap().expanded);
        assert!(layout.rekey(-3, 2).is_err());
        assert!(layout.rekey(-1, -4).is_err());
    }

    // =========================================================================
    // Removal
    // =========================================================================

    #[test]
    fn test_remove_entirely_compacts_rows() {
        let mut layout = layout(&[&[1, 2, 3, 4]]);
        layout.remove_entirely(2).unwrap();
        assert_eq!(grid(&layout), vec![vec![1, 3, 4]]);
        assert_eq!(layout.position(4).unwrap().row, 2);
    }

    #[test]
    fn test_remove_entirely_drops_empty_column() {
        let mut layout = layout(&[&[1], &[2], &[3, 4]]);
        layout.remove_entirely(2).unwrap();
        assert_eq!(grid(&layout), vec![vec![1], vec![3, 4]]);
        assert_eq!(layout.position(4).unwrap().column, 1);
    }

    #[test]
    fn test_remove_unknown_subobject_fails() {
        let mut layout = layout(&[&[1]]);
        assert_eq!(
            layout.remove_entirely(8).unwrap_err(),
            CompositeLayoutError::SubobjectNotFound { subobject_id: 8 }
        );
    }

    // =========================================================================
    // Drops on cards
    // =========================================================================

    #[test]
    fn test_drop_first_card_on_last_card() {
        let mut layout = layout(&[&[101, 1101, 2101, 3101]]);
        let outcome = layout.apply_drop(101, DropTarget::Subobject(3101)).unwrap();
        assert_eq!(outcome, DropOutcome::Moved);
        assert_eq!(grid(&layout), vec![vec![1101, 2101, 101, 3101]]);
    }

    #[test]
    fn test_drop_card_upwards_in_same_column() {
        let mut layout = layout(&[&[1, 2, 3, 4]]);
        layout.apply_drop(4, DropTarget::Subobject(2)).unwrap();
        assert_eq!(grid(&layout), vec![vec![1, 4, 2, 3]]);
    }

    #[test]
    fn test_drop_on_next_card_is_unchanged() {
        let mut layout = layout(&[&[1, 2, 3]]);
        let before = layout.clone();
        let outcome = layout.apply_drop(1, DropTarget::Subobject(2)).unwrap();
        assert_eq!(outcome, DropOutcome::Unchanged);
        assert_eq!(layout, before);
    }

    #[test]
    fn test_drop_on_itself_is_unchanged() {
        let mut layout = layout(&[&[1, 2]]);
        let before = layout.clone();
        assert_eq!(
            layout.apply_drop(2, DropTarget::Subobject(2)).unwrap(),
            DropOutcome::Unchanged
        );
        assert_eq!(layout, before);
    }

    #[test]
    fn test_drop_card_into_other_column() {
        let mut layout = layout(&[&[1, 2], &[3, 4]]);
        layout.apply_drop(1, DropTarget::Subobject(4)).unwrap();
        assert_eq!(grid(&layout), vec![vec![2], vec![3, 1, 4]]);
    }

    #[test]
    fn test_drop_lone_card_into_later_column_removes_its_column() {
        let mut layout = layout(&[&[1], &[2, 3], &[4]]);
        layout.apply_drop(1, DropTarget::Subobject(3)).unwrap();
        assert_eq!(grid(&layout), vec![vec![2, 1, 3], vec![4]]);
        assert!(layout.is_compact());
    }

    #[test]
    fn test_drop_lone_card_into_earlier_column() {
        let mut layout = layout(&[&[1, 2], &[3]]);
        layout.apply_drop(3, DropTarget::Subobject(1)).unwrap();
        assert_eq!(grid(&layout), vec![vec![3, 1, 2]]);
    }

    #[test]
    fn test_move_onto_position_validates_before_mutating() {
        let mut layout = layout(&[&[1, 2], &[3]]);
        let before = layout.clone();

        assert!(matches!(
            layout.move_onto_position(1, 5, 0),
            Err(CompositeLayoutError::ColumnOutOfRange { column: 5, .. })
        ));
        assert!(matches!(
            layout.move_onto_position(1, 1, 3),
            Err(CompositeLayoutError::RowOutOfRange { row: 3, .. })
        ));
        assert_eq!(layout, before);
    }

    // =========================================================================
    // Drops on column ends
    // =========================================================================

    #[test]
    fn test_drop_on_own_column_end_moves_to_bottom() {
        let mut layout = layout(&[&[1, 2, 3]]);
        layout.apply_drop(1, DropTarget::ColumnEnd(0)).unwrap();
        assert_eq!(grid(&layout), vec![vec![2, 3, 1]]);
    }

    #[test]
    fn test_drop_on_other_column_end() {
        let mut layout = layout(&[&[1, 2], &[3]]);
        layout.apply_drop(2, DropTarget::ColumnEnd(1)).unwrap();
        assert_eq!(grid(&layout), vec![vec![1], vec![3, 2]]);
    }

    #[test]
    fn test_drop_lone_card_on_own_column_end_is_unchanged() {
        let mut layout = layout(&[&[1, 2], &[3]]);
        let before = layout.clone();
        assert_eq!(
            layout.apply_drop(3, DropTarget::ColumnEnd(1)).unwrap(),
            DropOutcome::Unchanged
        );
        assert_eq!(layout, before);
    }

    // =========================================================================
    // New column dropzones
    // =========================================================================

    #[test]
    fn test_drop_on_right_new_column_dropzone() {
        let mut layout = layout(&[&[101, 1101, 2101, 3101]]);
        layout.apply_drop(1101, DropTarget::NewColumnRight(0)).unwrap();

        assert_eq!(grid(&layout), vec![vec![101, 2101, 3101], vec![1101]]);
        let rows: Vec<usize> = layout.column(0).iter().map(|p| p.row).collect();
        assert_eq!(rows, vec![0, 1, 2]);
        assert_eq!(layout.position(1101).unwrap().row, 0);
    }

    #[test]
    fn test_drop_on_left_new_column_dropzone_shifts_columns() {
        let mut layout = layout(&[&[1, 2], &[3]]);
        layout.apply_drop(3, DropTarget::NewColumnLeft(0)).unwrap();
        assert_eq!(grid(&layout), vec![vec![3], vec![1, 2]]);

        let mut layout = self::layout(&[&[1, 2], &[3, 4]]);
        layout.apply_drop(2, DropTarget::NewColumnLeft(1)).unwrap();
        assert_eq!(grid(&layout), vec![vec![1], vec![2], vec![3, 4]]);
    }

    #[test]
    fn test_lone_card_in_single_column_new_column_drops_are_unchanged() {
        for target in [DropTarget::NewColumnLeft(0), DropTarget::NewColumnRight(0)] {
            let mut layout = layout(&[&[101]]);
            let before = layout.clone();
            assert_eq!(layout.apply_drop(101, target).unwrap(), DropOutcome::Unchanged);
            assert_eq!(layout, before);
        }
    }

    #[test]
    fn test_last_remaining_card_new_column_drop_is_unchanged() {
        let mut layout = layout(&[&[1, 2]]);
        layout.apply_drop(2, DropTarget::NewColumnRight(0)).unwrap();
        layout.apply_drop(1, DropTarget::ColumnEnd(1)).unwrap();
        assert_eq!(grid(&layout), vec![vec![2, 1]]);

        let before = layout.clone();
        layout.apply_drop(2, DropTarget::Subobject(1)).unwrap();
        assert_eq!(layout, before, "dropping before the next card keeps the order");

        let mut single = self::layout(&[&[2]]);
        let before = single.clone();
        assert_eq!(
            single.apply_drop(2, DropTarget::NewColumnRight(0)).unwrap(),
            DropOutcome::Unchanged
        );
        assert_eq!(single, before);
    }

    #[test]
    fn test_lone_card_moves_to_far_new_column() {
        let mut layout = layout(&[&[1], &[2], &[3]]);
        layout.apply_drop(1, DropTarget::NewColumnRight(2)).unwrap();
        assert_eq!(grid(&layout), vec![vec![2], vec![3], vec![1]]);
    }

    #[test]
    fn test_drop_outside_grid_is_unchanged() {
        let mut layout = layout(&[&[1, 2], &[3]]);
        let before = layout.clone();
        assert_eq!(
            layout.apply_drop(1, DropTarget::Outside).unwrap(),
            DropOutcome::Unchanged
        );
        assert_eq!(layout, before);
    }

    #[test]
    fn test_move_preserves_card_state() {
        let mut layout = layout(&[&[1, 2], &[3]]);
        layout.toggle_expanded(1).unwrap();
        layout.delete(1).unwrap();
        layout.set_fetch_error(1, "Failed to fetch object").unwrap();

        layout.apply_drop(1, DropTarget::NewColumnRight(1)).unwrap();

        let position = layout.position(1).unwrap();
        assert_eq!((position.column, position.row), (2, 0));
        assert!(!position.expanded);
        assert_eq!(position.delete_mode, DeleteMode::Deleted);
        assert!(position.has_fetch_error());
    }

    #[test]
    fn test_failed_card_can_be_a_drop_target() {
        let mut layout = layout(&[&[1, 2, 3]]);
        layout.set_fetch_error(3, "Not found").unwrap();
        layout.apply_drop(1, DropTarget::Subobject(3)).unwrap();
        assert_eq!(grid(&layout), vec![vec![2, 1, 3]]);
    }

    // =========================================================================
    // Delete modes and expansion
    // =========================================================================

    #[test]
    fn test_delete_mode_transitions() {
        let mut layout = layout(&[&[1]]);

        layout.delete(1).unwrap();
        assert!(matches!(
            layout.fully_delete(1),
            Err(CompositeLayoutError::InvalidDeleteTransition {
                from: DeleteMode::Deleted,
                to: DeleteMode::FullyDeleted,
                ..
            })
        ));
        layout.restore(1).unwrap();

        layout.fully_delete(1).unwrap();
        assert!(layout.delete(1).is_err());
        layout.restore(1).unwrap();

        assert!(layout.restore(1).is_err(), "nothing to restore");
        assert_eq!(layout.position(1).unwrap().delete_mode, DeleteMode::None);
    }

    #[test]
    fn test_toggle_expanded_keeps_coordinates() {
        let mut layout = layout(&[&[1, 2]]);
        assert!(!layout.toggle_expanded(2).unwrap());
        assert!(layout.toggle_expanded(2).unwrap());
        assert_eq!(layout.position(2).unwrap().row, 1);
    }

    // =========================================================================
    // Save projection
    // =========================================================================

    #[test]
    fn test_save_payload_drops_deleted_and_compacts() {
        let mut layout = layout(&[&[1, 2, 3], &[4]]);
        layout.delete(2).unwrap();
        layout.fully_delete(4).unwrap();

        let payload = layout.to_save_payload();

        assert_eq!(payload.deleted_subobject_ids, vec![2]);
        assert_eq!(payload.fully_deleted_subobject_ids, vec![4]);
        let coordinates: Vec<(ObjectId, usize, usize)> = payload
            .subobjects
            .iter()
            .map(|s| (s.subobject_id, s.column, s.row))
            .collect();
        assert_eq!(coordinates, vec![(1, 0, 0), (3, 0, 1)]);

        assert_eq!(layout.len(), 4, "the edit layout keeps deleted cards");
    }

    // =========================================================================
    // Drag eligibility
    // =========================================================================

    #[test]
    fn test_drag_eligibility_is_reevaluated_per_hover() {
        let mut eligibility = DragEligibility::new();
        assert!(!eligibility.can_start_drag());

        eligibility.pointer_enter_heading();
        assert!(eligibility.can_start_drag());

        eligibility.pointer_enter_toggle();
        assert!(!eligibility.can_start_drag());

        eligibility.pointer_leave_toggle();
        assert!(eligibility.can_start_drag(), "leaving the toggle re-enables drag");

        eligibility.pointer_enter_toggle();
        eligibility.pointer_leave_heading();
        eligibility.pointer_enter_heading();
        assert!(eligibility.can_start_drag());
    }

    // =========================================================================
    // Properties
    // =========================================================================

    #[derive(Debug, Clone)]
    enum Op {
        AddNew,
        Remove(usize),
        Drop(usize, usize, u8),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::AddNew),
            any::<usize>().prop_map(Op::Remove),
            (any::<usize>(), any::<usize>(), 0u8..5).prop_map(|(a, b, k)| Op::Drop(a, b, k)),
        ]
    }

    fn pick(layout: &CompositeLayout, index: usize) -> Option<ObjectId> {
        let ids = layout.subobject_ids();
        if ids.is_empty() {
            None
        } else {
            Some(ids[index % ids.len()])
        }
    }

    proptest! {
        #[test]
        fn prop_grid_stays_compact(ops in prop::collection::vec(arb_op(), 1..40)) {
            let mut layout = layout(&[&[1, 2, 3], &[4, 5], &[6]]);

            for op in ops {
                match op {
                    Op::AddNew => {
                        layout.add_new_subobject();
                    }
                    Op::Remove(i) => {
                        if let Some(id) = pick(&layout, i) {
                            layout.remove_entirely(id).unwrap();
                        }
                    }
                    Op::Drop(a, b, kind) => {
                        let (Some(dragged), Some(target)) = (pick(&layout, a), pick(&layout, b)) else {
                            continue;
                        };
                        let column = layout.position(target).unwrap().column;
                        let drop = match kind {
                            0 => DropTarget::Subobject(target),
                            1 => DropTarget::ColumnEnd(column),
                            2 => DropTarget::NewColumnLeft(column),
                            3 => DropTarget::NewColumnRight(column),
                            _ => DropTarget::Outside,
                        };
                        let count = layout.len();
                        layout.apply_drop(dragged, drop).unwrap();
                        prop_assert_eq!(layout.len(), count);
                    }
                }

                prop_assert!(layout.is_compact(), "layout not compact: {:?}", layout);
                let columns: Vec<usize> = layout.positions().map(|p| p.column).collect();
                for column in 0..layout.column_count() {
                    prop_assert!(columns.contains(&column));
                }
            }
        }
    }
}
