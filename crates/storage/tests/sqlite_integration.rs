use chrono::{Duration, TimeZone, Utc};
use lms_core::model::schema::{elements, models};
use lms_core::model::{
    Context, Element, ElementValue, EntryId, NewProgressRecord, Percent, ProjectId, UserId,
};
use storage::repository::{
    ElementMatch, EntryQuery, EntryRepository, NewEntry, ProgressRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn ctx() -> Context {
    Context::new(ProjectId::new("p1"), UserId::new("u1"))
}

fn record(entry: &str, percent: i64, suffix: &str) -> NewProgressRecord {
    NewProgressRecord::with_suffix(EntryId::new(entry), Percent::new(percent).unwrap(), suffix)
}

#[tokio::test]
async fn sqlite_entries_expand_references_to_requested_depth() {
    let repo = connect("memdb_entries_depth").await;
    let project = ProjectId::new("p1");
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let page = repo
        .create_entry(&project, NewEntry::new(models::PAGES, "page", "Page").created_at(t0))
        .await
        .unwrap();
    let lesson = repo
        .create_entry(
            &project,
            NewEntry::new(models::LESSONS, "lesson", "Lesson")
                .created_at(t0)
                .element(Element::references(elements::LESSON_PAGES, [&page])),
        )
        .await
        .unwrap();
    let section = repo
        .create_entry(
            &project,
            NewEntry::new(models::SECTIONS, "section", "Section")
                .created_at(t0 + Duration::minutes(1))
                .element(Element::references(elements::LESSONS, [&lesson])),
        )
        .await
        .unwrap();

    let shallow = repo
        .get_entries(&project, &EntryQuery::model(models::SECTIONS))
        .await
        .unwrap();
    assert_eq!(shallow.len(), 1);
    assert_eq!(shallow[0].id, section);
    assert_eq!(shallow[0].created_at, Some(t0 + Duration::minutes(1)));
    let lessons = shallow[0].referenced(elements::LESSONS);
    assert!(lessons[0].is_stub());
    assert_eq!(lessons[0].display_name(), Some("Lesson"));

    let deep = repo
        .get_entries(&project, &EntryQuery::model(models::SECTIONS).depth(1))
        .await
        .unwrap();
    let lesson_entry = &deep[0].referenced(elements::LESSONS)[0];
    assert!(!lesson_entry.is_stub());
    assert!(lesson_entry.referenced(elements::LESSON_PAGES)[0].is_stub());
}

#[tokio::test]
async fn sqlite_nested_filter_finds_course_by_lesson() {
    let repo = connect("memdb_nested_filter").await;
    let project = ProjectId::new("p1");

    let lesson = repo
        .create_entry(&project, NewEntry::new(models::LESSONS, "l", "L"))
        .await
        .unwrap();
    let other_lesson = repo
        .create_entry(&project, NewEntry::new(models::LESSONS, "l2", "L2"))
        .await
        .unwrap();
    let section = repo
        .create_entry(
            &project,
            NewEntry::new(models::SECTIONS, "s", "S")
                .element(Element::references(elements::LESSONS, [&lesson])),
        )
        .await
        .unwrap();
    let course = repo
        .create_entry(
            &project,
            NewEntry::new(models::COURSES, "c", "C")
                .element(Element::references(elements::SECTIONS, [&section])),
        )
        .await
        .unwrap();

    let by_lesson = |id: &EntryId| {
        EntryQuery::model(models::COURSES).element(
            elements::SECTIONS,
            ElementMatch::ContainsEntryWhere(vec![storage::ElementFilter {
                api_name: elements::LESSONS.to_owned(),
                matcher: ElementMatch::ContainsEntry(id.clone()),
            }]),
        )
    };

    let found = repo.get_entries(&project, &by_lesson(&lesson)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, course);

    let none = repo
        .get_entries(&project, &by_lesson(&other_lesson))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn sqlite_update_merges_and_delete_drops_dangling_references() {
    let repo = connect("memdb_update_delete").await;
    let project = ProjectId::new("p1");

    let a = repo
        .create_entry(&project, NewEntry::new(models::LESSONS, "a", "A"))
        .await
        .unwrap();
    let b = repo
        .create_entry(&project, NewEntry::new(models::LESSONS, "b", "B"))
        .await
        .unwrap();
    let section = repo
        .create_entry(
            &project,
            NewEntry::new(models::SECTIONS, "s", "S")
                .element(Element::new(
                    elements::SECTION_DESCRIPTION,
                    ElementValue::text("en", "old"),
                ))
                .element(Element::references(elements::LESSONS, [&a, &b])),
        )
        .await
        .unwrap();

    repo.update_elements(
        &project,
        &section,
        vec![Element::new(
            elements::SECTION_DESCRIPTION,
            ElementValue::text("en", "new"),
        )],
    )
    .await
    .unwrap();
    repo.delete_entries(&project, std::slice::from_ref(&a))
        .await
        .unwrap();

    let found = repo
        .get_entries(&project, &EntryQuery::default().id(&section))
        .await
        .unwrap();
    let entry = &found[0];
    assert_eq!(
        entry.element(elements::SECTION_DESCRIPTION).unwrap().value,
        Some(ElementValue::text("en", "new"))
    );
    let remaining: Vec<_> = entry
        .referenced(elements::LESSONS)
        .iter()
        .map(|e| e.id.clone())
        .collect();
    assert_eq!(remaining, vec![b]);

    let missing = repo
        .update_elements(&project, &a, vec![])
        .await
        .unwrap_err();
    assert!(matches!(missing, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_duplicate_entry_id_conflicts() {
    let repo = connect("memdb_entry_conflict").await;
    let project = ProjectId::new("p1");
    let new = NewEntry::new(models::COURSES, "c", "C").with_id(EntryId::new("C1"));
    repo.create_entry(&project, new.clone()).await.unwrap();
    let err = repo.create_entry(&project, new.clone()).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    // same id in another project is fine
    repo.create_entry(&ProjectId::new("p2"), new).await.unwrap();
}

#[tokio::test]
async fn sqlite_upsert_is_idempotent_per_user_and_entry() {
    let repo = connect("memdb_upsert").await;

    repo.upsert_progress(&ctx(), &record("L1", 30, "a")).await.unwrap();
    repo.upsert_progress(&ctx(), &record("L1", 90, "b")).await.unwrap();
    repo.upsert_progress(&ctx(), &record("L2", 10, "c")).await.unwrap();

    let found = repo
        .find_progress(&ctx(), &[EntryId::new("L1"), EntryId::new("L2")])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    let l1 = found.iter().find(|r| r.entry_id.as_str() == "L1").unwrap();
    assert_eq!(l1.percent.value(), 90);
    assert_eq!(l1.user_id, UserId::new("u1"));

    let other = ctx().for_user(UserId::new("u2"));
    assert!(repo
        .find_progress(&other, &[EntryId::new("L1")])
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn sqlite_second_create_conflicts_and_delete_is_scoped() {
    let repo = connect("memdb_progress_conflict").await;

    repo.create_progress(&ctx(), &record("L1", 10, "a"))
        .await
        .unwrap();
    let err = repo
        .create_progress(&ctx(), &record("L1", 20, "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let other = ctx().for_user(UserId::new("u2"));
    repo.create_progress(&other, &record("L1", 50, "c"))
        .await
        .unwrap();

    repo.delete_progress(&ctx(), &[EntryId::new("L1")])
        .await
        .unwrap();
    assert!(repo
        .find_progress(&ctx(), &[EntryId::new("L1")])
        .await
        .unwrap()
        .is_empty());
    let kept = repo
        .find_progress(&other, &[EntryId::new("L1")])
        .await
        .unwrap();
    assert_eq!(kept[0].percent.value(), 50);
}
