use super::*;
use crate::verse::Point;

const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

fn turn(role: Role, content: &str) -> ContextTurn {
    ContextTurn { role, content: content.into() }
}

/// Root `A` with `[user:hi, assistant:hello, user:bye]`, ids m1..m3.
fn scenario_root(collection: &mut VerseCollection) -> (VerseId, [MessageId; 3]) {
    let a = collection.create_root(Some("A"), None, Point::default(), DEFAULT_MODEL);
    let m1 = collection.append_message(a.id, Role::User, "hi").unwrap().id;
    let m2 = collection.append_message(a.id, Role::Assistant, "hello").unwrap().id;
    let m3 = collection.append_message(a.id, Role::User, "bye").unwrap().id;
    (a.id, [m1, m2, m3])
}

#[test]
fn root_context_is_empty() {
    let mut collection = VerseCollection::new();
    let (a, _) = scenario_root(&mut collection);
    assert!(collection.assemble_context(a).unwrap().is_empty());
}

#[test]
fn missing_target_is_not_found() {
    let collection = VerseCollection::new();
    let id = VerseId::new();
    assert_eq!(collection.assemble_context(id).unwrap_err(), VerseError::VerseNotFound(id));
}

#[test]
fn message_branch_truncates_parent_history_at_branch_point() {
    let mut collection = VerseCollection::new();
    let (a, [_, m2, _]) = scenario_root(&mut collection);
    let b = collection.create_branch(a, None, Some(m2), DEFAULT_MODEL).unwrap();

    let context = collection.assemble_context(b.id).unwrap();
    assert_eq!(context, vec![turn(Role::User, "hi"), turn(Role::Assistant, "hello")]);
}

#[test]
fn whole_verse_branch_gets_full_parent_history() {
    let mut collection = VerseCollection::new();
    let (a, _) = scenario_root(&mut collection);
    let b = collection.create_branch(a, None, None, DEFAULT_MODEL).unwrap();

    let context = collection.assemble_context(b.id).unwrap();
    assert_eq!(
        context,
        vec![turn(Role::User, "hi"), turn(Role::Assistant, "hello"), turn(Role::User, "bye")]
    );
}

#[test]
fn multi_level_concatenates_ancestors_oldest_first() {
    let mut collection = VerseCollection::new();
    let (a, [_, m2, _]) = scenario_root(&mut collection);
    let b = collection.create_branch(a, None, Some(m2), DEFAULT_MODEL).unwrap();
    let c = collection.create_branch(b.id, None, None, DEFAULT_MODEL).unwrap();

    // B has only its seeded system message, so C sees exactly B's context.
    let context = collection.assemble_context(c.id).unwrap();
    assert_eq!(context, vec![turn(Role::User, "hi"), turn(Role::Assistant, "hello")]);

    collection.append_message(b.id, Role::User, "what next?").unwrap();
    collection.append_message(b.id, Role::Assistant, "ideas").unwrap();
    let context = collection.assemble_context(c.id).unwrap();
    assert_eq!(
        context,
        vec![
            turn(Role::User, "hi"),
            turn(Role::Assistant, "hello"),
            turn(Role::User, "what next?"),
            turn(Role::Assistant, "ideas"),
        ]
    );
}

#[test]
fn truncation_applies_only_where_the_branch_happened() {
    let mut collection = VerseCollection::new();
    let (a, _) = scenario_root(&mut collection);
    let b = collection.create_branch(a, None, None, DEFAULT_MODEL).unwrap();
    let b1 = collection.append_message(b.id, Role::User, "b-one").unwrap().id;
    collection.append_message(b.id, Role::Assistant, "b-two").unwrap();
    let c = collection.create_branch(b.id, None, Some(b1), DEFAULT_MODEL).unwrap();

    let context = collection.assemble_context(c.id).unwrap();
    assert_eq!(
        context,
        vec![
            turn(Role::User, "hi"),
            turn(Role::Assistant, "hello"),
            turn(Role::User, "bye"),
            turn(Role::User, "b-one"),
        ]
    );
    assert!(context.iter().all(|t| t.content != "b-two"));
}

#[test]
fn later_parent_messages_do_not_leak_into_message_branch() {
    let mut collection = VerseCollection::new();
    let (a, [_, m2, _]) = scenario_root(&mut collection);
    let b = collection.create_branch(a, None, Some(m2), DEFAULT_MODEL).unwrap();
    collection.append_message(a, Role::Assistant, "after the branch").unwrap();

    let context = collection.assemble_context(b.id).unwrap();
    assert_eq!(context.len(), 2);
    assert!(context.iter().all(|t| t.content != "after the branch"));
}

#[test]
fn system_messages_are_never_replayed() {
    let mut collection = VerseCollection::new();
    let (a, _) = scenario_root(&mut collection);
    collection.append_message(a, Role::System, "note to self").unwrap();
    let b = collection.create_branch(a, None, None, DEFAULT_MODEL).unwrap();
    let c = collection.create_branch(b.id, None, None, DEFAULT_MODEL).unwrap();

    let context = collection.assemble_context(c.id).unwrap();
    assert!(context.iter().all(|t| t.role != Role::System));
    assert_eq!(context.len(), 3);
}

#[test]
fn branch_at_system_entry_keeps_full_filtered_history() {
    let mut collection = VerseCollection::new();
    let (a, _) = scenario_root(&mut collection);
    let b = collection.create_branch(a, None, None, DEFAULT_MODEL).unwrap();
    let seed = b.chat_history[0].id;
    collection.append_message(b.id, Role::User, "b-one").unwrap();
    collection.append_message(b.id, Role::Assistant, "b-two").unwrap();
    let c = collection.create_branch(b.id, None, Some(seed), DEFAULT_MODEL).unwrap();

    // The seed is branch metadata, so B contributes everything it has.
    let context = collection.assemble_context(c.id).unwrap();
    assert_eq!(
        context,
        vec![
            turn(Role::User, "hi"),
            turn(Role::Assistant, "hello"),
            turn(Role::User, "bye"),
            turn(Role::User, "b-one"),
            turn(Role::Assistant, "b-two"),
        ]
    );
}

#[test]
fn unknown_branch_point_degrades_to_full_history() {
    let mut collection = VerseCollection::new();
    let (a, _) = scenario_root(&mut collection);
    let mut orphan_point = Verse::new(DEFAULT_MODEL);
    orphan_point.parent_id = Some(a);
    orphan_point.branch_source_message_id = Some(MessageId::new());
    let id = orphan_point.id;
    collection.insert(orphan_point).unwrap();

    let context = collection.assemble_context(id).unwrap();
    assert_eq!(context.len(), 3);
}

#[test]
fn dangling_parent_yields_empty_context() {
    let mut collection = VerseCollection::new();
    let mut verse = Verse::new(DEFAULT_MODEL);
    verse.parent_id = Some(VerseId::new());
    let id = verse.id;
    collection.insert(verse).unwrap();

    assert!(collection.assemble_context(id).unwrap().is_empty());
}

#[test]
fn corrupted_cycle_terminates() {
    let mut collection = VerseCollection::new();
    let mut x = Verse::new(DEFAULT_MODEL);
    let mut y = Verse::new(DEFAULT_MODEL);
    x.parent_id = Some(y.id);
    y.parent_id = Some(x.id);
    let message = x.next_message(Role::User, "loop".into());
    x.chat_history.push(message);
    let (x_id, y_id) = (x.id, y.id);
    collection.insert(x).unwrap();
    collection.insert(y).unwrap();

    // y -> x -> (y already visited) stops.
    let context = collection.assemble_context(y_id).unwrap();
    assert_eq!(context, vec![turn(Role::User, "loop")]);
    assert!(collection.assemble_context(x_id).unwrap().is_empty());
}

#[test]
fn overlong_chain_is_bounded() {
    let mut collection = VerseCollection::new();
    let root = collection.create_root(None, None, Point::default(), DEFAULT_MODEL);
    collection.append_message(root.id, Role::User, "origin").unwrap();
    let mut tip = root.id;
    for _ in 0..(MAX_ANCESTOR_DEPTH + 5) {
        tip = collection.create_branch(tip, None, None, DEFAULT_MODEL).unwrap().id;
    }

    // The root sits beyond the depth bound, so its message is cut off.
    let context = collection.assemble_context(tip).unwrap();
    assert!(context.is_empty());
}

#[test]
fn assembly_is_pure() {
    let mut collection = VerseCollection::new();
    let (a, [_, m2, _]) = scenario_root(&mut collection);
    let b = collection.create_branch(a, None, Some(m2), DEFAULT_MODEL).unwrap();
    let snapshot = collection.clone();

    let first = collection.assemble_context(b.id).unwrap();
    let second = collection.assemble_context(b.id).unwrap();
    assert_eq!(first, second);
    assert_eq!(collection, snapshot);
}
