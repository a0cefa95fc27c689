use luminist_core::db::open_db_in_memory;
use luminist_core::model::project::{Dimensions, NewProject};
use luminist_core::{
    can_create, AdmissionPolicy, ProjectListQuery, ProjectService, ProjectServiceError,
    SqliteProjectRepository,
};
use uuid::Uuid;

fn request(index: usize) -> NewProject {
    NewProject::new(
        format!("project {index}"),
        format!("https://ik.imagekit.io/acct/p{index}.jpg"),
        Dimensions::new(640, 480),
    )
}

#[test]
fn threshold_matches_free_plan() {
    assert!(can_create(4, 5));
    assert!(!can_create(5, 5));
}

#[test]
fn fifth_project_is_admitted_and_sixth_refused() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(
        SqliteProjectRepository::new(&conn),
        AdmissionPolicy::default(),
    );

    for index in 0..5 {
        service.create_project(&request(index)).unwrap();
    }
    assert!(!service.can_create_project().unwrap());

    let err = service.create_project(&request(5)).unwrap_err();
    assert!(matches!(
        err,
        ProjectServiceError::LimitReached {
            current: 5,
            limit: 5
        }
    ));
    assert_eq!(
        service
            .list_projects(&ProjectListQuery::default())
            .unwrap()
            .len(),
        5
    );
}

#[test]
fn deleting_frees_a_slot() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(
        SqliteProjectRepository::new(&conn),
        AdmissionPolicy::Limited(1),
    );

    let first = service.create_project(&request(0)).unwrap();
    assert!(service.create_project(&request(1)).is_err());

    service.delete_project(first.id).unwrap();
    let second = service.create_project(&request(1)).unwrap();
    assert_eq!(second.canonical_locator, "https://ik.imagekit.io/acct/p1.jpg");
}

#[test]
fn unlimited_policy_never_refuses() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(
        SqliteProjectRepository::new(&conn),
        AdmissionPolicy::Unlimited,
    );

    for index in 0..8 {
        service.create_project(&request(index)).unwrap();
    }
    assert!(service.can_create_project().unwrap());
}

#[test]
fn deleting_unknown_project_maps_to_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(
        SqliteProjectRepository::new(&conn),
        AdmissionPolicy::default(),
    );

    let id = Uuid::new_v4();
    assert!(matches!(
        service.delete_project(id),
        Err(ProjectServiceError::ProjectNotFound(missing)) if missing == id
    ));
}
