mod common;

use chrono::NaiveDate;
use common::date;
use hearth_core::{
    aggregate, AggregateFilter, ItemKind, ItemStatus, Occurrence, OneOffEntry, Priority,
    SourceTool,
};
use uuid::Uuid;

fn occurrence(title: &str, due: NaiveDate, priority: Priority) -> Occurrence {
    Occurrence {
        definition_id: Uuid::new_v4(),
        source_tool: SourceTool::CarePlan,
        title: title.to_string(),
        notes: None,
        due_date: due,
        priority,
        status: ItemStatus::Pending,
    }
}

fn titles(items: &[hearth_core::ActionItem]) -> Vec<&str> {
    items.iter().map(|item| item.title.as_str()).collect()
}

#[test]
fn orders_by_date_then_priority() {
    let occurrences = vec![
        occurrence("A", date(2025, 3, 5), Priority::High),
        occurrence("B", date(2025, 3, 3), Priority::Low),
        occurrence("C", date(2025, 3, 3), Priority::High),
    ];

    let items = aggregate(
        occurrences,
        Vec::new(),
        date(2025, 3, 1),
        &AggregateFilter::default(),
    );
    assert_eq!(titles(&items), vec!["C", "B", "A"]);
}

#[test]
fn equal_date_and_priority_fall_back_to_title() {
    let occurrences = vec![
        occurrence("Vet visit", date(2025, 3, 3), Priority::Medium),
        occurrence("Brush dog", date(2025, 3, 3), Priority::Medium),
    ];
    let one_offs = vec![OneOffEntry::new(
        "house-1",
        SourceTool::Appointment,
        "Dentist",
        date(2025, 3, 3),
    )];

    let items = aggregate(occurrences, one_offs, date(2025, 3, 1), &AggregateFilter::default());
    assert_eq!(titles(&items), vec!["Brush dog", "Dentist", "Vet visit"]);
    assert_eq!(items[1].kind, ItemKind::OneOff);
    assert_eq!(items[1].source_tool, SourceTool::Appointment);
}

#[test]
fn duplicates_by_definition_and_date_collapse() {
    let first = occurrence("Litter box", date(2025, 3, 3), Priority::Medium);
    let mut overlapping = first.clone();
    overlapping.title = "Litter box (again)".to_string();
    let next_day = Occurrence {
        due_date: date(2025, 3, 4),
        ..first.clone()
    };

    let items = aggregate(
        vec![first, overlapping, next_day],
        Vec::new(),
        date(2025, 3, 1),
        &AggregateFilter::default(),
    );
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Litter box");
    assert_eq!(items[1].due_date, date(2025, 3, 4));
}

#[test]
fn overdue_requires_past_date_and_pending_status() {
    let today = date(2025, 3, 10);
    let mut done = OneOffEntry::new(
        "house-1",
        SourceTool::Todo,
        "Return library books",
        date(2025, 3, 1),
    );
    done.status = ItemStatus::Completed;
    let late = OneOffEntry::new("house-1", SourceTool::Todo, "Pay water bill", date(2025, 3, 2));
    let due_today = OneOffEntry::new("house-1", SourceTool::Appointment, "Plumber", today);

    let items = aggregate(
        Vec::new(),
        vec![done, late, due_today],
        today,
        &AggregateFilter::default(),
    );
    let overdue = items
        .iter()
        .map(|item| (item.title.as_str(), item.is_overdue))
        .collect::<Vec<_>>();
    assert_eq!(
        overdue,
        vec![
            ("Return library books", false),
            ("Pay water bill", true),
            ("Plumber", false)
        ]
    );
    assert_eq!(items[0].status, ItemStatus::Completed);
}

#[test]
fn status_filter_and_limit_apply_after_sorting() {
    let mut skipped = occurrence("Skipped", date(2025, 3, 1), Priority::High);
    skipped.status = ItemStatus::Skipped;
    let occurrences = vec![
        occurrence("Third", date(2025, 3, 9), Priority::Low),
        skipped,
        occurrence("First", date(2025, 3, 2), Priority::Low),
        occurrence("Second", date(2025, 3, 5), Priority::Low),
    ];

    let filter = AggregateFilter {
        status: Some(ItemStatus::Pending),
        limit: Some(2),
    };
    let items = aggregate(occurrences, Vec::new(), date(2025, 3, 1), &filter);
    assert_eq!(titles(&items), vec!["First", "Second"]);
}

#[test]
fn serializes_with_camel_case_fields() {
    let items = aggregate(
        vec![occurrence("Walk", date(2025, 3, 3), Priority::High)],
        Vec::new(),
        date(2025, 3, 4),
        &AggregateFilter::default(),
    );
    let json = serde_json::to_value(&items[0]).unwrap();
    assert_eq!(json["sourceTool"], "care_plan");
    assert_eq!(json["dueDate"], "2025-03-03");
    assert_eq!(json["isOverdue"], true);
    assert_eq!(json["kind"], "recurring");
    assert_eq!(json["priority"], "high");
}
