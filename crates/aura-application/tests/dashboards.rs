mod common;

use aura_application::controllers::DoctorTab;
use aura_application::{
    AdminDashboardController, AnalysisResultController, DoctorDashboardController,
    UserDashboardController, ViewUpdate,
};
use aura_core::access::ViewId;
use aura_core::admin::AccountStatus;
use aura_core::error::AuraError;
use aura_core::record::{AnalysisStatus, ImageMode, Severity};
use aura_core::roster::PatientRoster;
use aura_core::session::Role;
use common::{FakeApi, managed_user, record, signed_in};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_analysis_polls_until_completed() {
    let api = FakeApi::new();
    api.with(|s| {
        s.record_script = [
            Ok(record("r1", "PENDING", None)),
            Err(AuraError::connectivity("timeout")),
            Ok(record("r1", "Hoàn thành", Some("Nặng (Severe DR) (91.20%)"))),
        ]
        .into();
    });
    let ctx = signed_in(api.clone(), Some(Role::User));
    let mut analysis = AnalysisResultController::mount(ctx, "r1").unwrap();

    // Pending, then a transient failure shown inline.
    assert_eq!(analysis.process_next().await, Some(ViewUpdate::Changed));
    assert!(!analysis.toggle_image_mode());
    assert!(analysis.view().advice.is_none());
    assert!(analysis.view().insights.is_none());
    assert_eq!(analysis.process_next().await, Some(ViewUpdate::Changed));
    assert!(analysis.view().error.is_some());

    // Completed clears the notice and ends the poller.
    assert_eq!(analysis.process_next().await, Some(ViewUpdate::Changed));
    assert_eq!(analysis.process_next().await, None);

    let view = analysis.view();
    assert!(!view.polling);
    assert!(view.error.is_none());
    assert_eq!(view.record.unwrap().status, AnalysisStatus::Completed);
    assert_eq!(view.severity, Severity::Danger);
    assert_eq!(view.diagnosis.unwrap().confidence, Some(91.2));
    assert!(view.advice.unwrap().starts_with("⚠️ CẢNH BÁO"));
    let insights = view.insights.unwrap();
    assert!(insights.prognosis.starts_with("Giai đoạn muộn"));
    assert_eq!(insights.systemic_risks.len(), 3);

    assert!(analysis.toggle_image_mode());
    let view = analysis.view();
    assert_eq!(view.image_mode, ImageMode::Annotated);
    assert_eq!(view.image_url.as_deref(), Some("/uploads/r1_annotated.png"));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.calls("get_record"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_analysis_ignores_a_glitch_but_surfaces_a_streak() {
    let api = FakeApi::new();
    api.with(|s| {
        s.record_script = [
            Ok(record("r1", "PENDING", None)),
            Err(AuraError::malformed("missing status")),
            Err(AuraError::malformed("missing status")),
            Err(AuraError::malformed("missing status")),
        ]
        .into();
        s.records = vec![record("r1", "PENDING", None)];
    });
    let ctx = signed_in(api, Some(Role::User));
    let mut analysis = AnalysisResultController::mount(ctx, "r1").unwrap();

    assert_eq!(analysis.process_next().await, Some(ViewUpdate::Changed));
    assert_eq!(analysis.process_next().await, Some(ViewUpdate::Unchanged));
    assert_eq!(analysis.process_next().await, Some(ViewUpdate::Unchanged));
    assert!(analysis.view().error.is_none());
    assert_eq!(analysis.process_next().await, Some(ViewUpdate::Changed));

    let view = analysis.view();
    assert!(view.error.is_some());
    assert_eq!(view.record.unwrap().status, AnalysisStatus::Pending);

    // A good snapshot clears the indicator.
    assert_eq!(analysis.process_next().await, Some(ViewUpdate::Changed));
    assert!(analysis.view().error.is_none());
    analysis.unmount();
}

#[tokio::test(start_paused = true)]
async fn test_history_stops_once_every_record_is_terminal() {
    let api = FakeApi::new();
    api.with(|s| {
        s.records = vec![
            record("r2", "PENDING", None),
            record("r1", "Hoàn thành", Some("Bình thường (No DR) (98.54%)")),
        ]
    });
    let ctx = signed_in(api.clone(), Some(Role::User));
    let mut dashboard = UserDashboardController::mount(ctx).unwrap();

    assert_eq!(dashboard.process_next().await, Some(ViewUpdate::Changed));
    assert!(dashboard.is_polling());
    let view = dashboard.view();
    assert_eq!(view.display_name, "Lan");
    assert_eq!(view.latest_severity, Some(Severity::Safe));

    api.with(|s| {
        s.records[0] = record("r2", "FAILED", None);
    });
    while dashboard.process_next().await.is_some() {}
    assert!(!dashboard.is_polling());

    let calls = api.calls("list_records");
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.calls("list_records"), calls);

    let statuses: Vec<_> = dashboard.view().records.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![AnalysisStatus::Failed, AnalysisStatus::Completed]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_history_polls_once() {
    let api = FakeApi::new();
    let ctx = signed_in(api.clone(), Some(Role::User));
    let mut dashboard = UserDashboardController::mount(ctx).unwrap();
    while dashboard.process_next().await.is_some() {}

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.calls("list_records"), 1);
    assert!(dashboard.view().records.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_doctor_sees_pending_reviews() {
    let api = FakeApi::new();
    let roster: PatientRoster = serde_json::from_value(serde_json::json!({
        "patients": [
            {
                "id": "p1",
                "userName": "Hoa",
                "latest_scan": {
                    "record_id": "r9",
                    "date": "02/03/2025",
                    "result": "Tăng sinh (Proliferative DR) (88.00%)",
                    "ai_status": "COMPLETED"
                }
            },
            {
                "id": "p2",
                "userName": "Nam",
                "latest_scan": {"result": "Nặng", "ai_status": "PENDING"}
            },
            {"id": "p3", "userName": "Mai"}
        ]
    }))
    .unwrap();
    api.with(|s| s.roster = roster);
    let ctx = signed_in(api, Some(Role::Doctor));

    let mut dashboard = DoctorDashboardController::mount(ctx).unwrap();
    assert_eq!(dashboard.process_next().await, Some(ViewUpdate::Changed));

    dashboard.toggle_user_menu();
    dashboard.select_tab(DoctorTab::Reviews);
    let view = dashboard.view();
    assert_eq!(view.patients.len(), 3);
    assert_eq!(view.pending_reviews.len(), 1);
    assert_eq!(view.pending_reviews[0].record_id, "r9");
    assert_eq!(view.pending_reviews[0].patient_name, "Hoa");
    assert_eq!(view.ui.tab, DoctorTab::Reviews);
    assert!(!view.ui.user_menu.is_open());
    dashboard.unmount();
}

fn seed_users(api: &FakeApi) {
    api.with(|s| {
        s.users = vec![
            managed_user("a1", "root", "ADMIN", "ACTIVE"),
            managed_user("d1", "Dr. Minh", "DOCTOR", "ACTIVE"),
            managed_user("u1", "Lan", "USER", "ACTIVE"),
        ]
    });
}

#[tokio::test]
async fn test_admin_list_refused_goes_to_user_dashboard() {
    let api = FakeApi::new();
    api.with(|s| s.users_error = Some(AuraError::forbidden("Not enough permissions")));
    let ctx = signed_in(api, Some(Role::Admin));
    assert_eq!(
        AdminDashboardController::mount(ctx).await.err(),
        Some(ViewId::UserDashboard)
    );
}

#[tokio::test]
async fn test_admin_partitions_and_assigns() {
    let api = FakeApi::new();
    seed_users(&api);
    let ctx = signed_in(api.clone(), Some(Role::Admin));
    let Ok(mut admin) = AdminDashboardController::mount(ctx).await else {
        panic!("admin dashboard refused");
    };

    let view = admin.view();
    let names: Vec<_> = view.users.iter().map(|u| u.display_name.as_str()).collect();
    assert_eq!(names, vec!["Dr. Minh", "Lan"]);
    assert_eq!(view.doctors.len(), 1);

    assert!(admin.assign_doctor("u1", "").await.unwrap_err().is_validation());
    let receipt = admin.assign_doctor("u1", "d1").await.unwrap();
    assert_eq!(receipt.doctor_name.as_deref(), Some("Dr. Minh"));
    assert_eq!(api.calls("admin_users"), 2);
    let patient = admin.view().users.into_iter().find(|u| u.id == "u1").unwrap();
    assert_eq!(patient.assigned_doctor_id.as_deref(), Some("d1"));
}

#[tokio::test]
async fn test_admin_status_toggle_is_optimistic() {
    let api = FakeApi::new();
    seed_users(&api);
    let ctx = signed_in(api.clone(), Some(Role::Admin));
    let Ok(mut admin) = AdminDashboardController::mount(ctx).await else {
        panic!("admin dashboard refused");
    };
    let status_of = |admin: &AdminDashboardController| {
        admin
            .view()
            .users
            .into_iter()
            .find(|u| u.id == "u1")
            .map(|u| u.status)
    };

    assert_eq!(admin.toggle_user_status("u1").unwrap(), AccountStatus::Inactive);
    assert_eq!(status_of(&admin), Some(AccountStatus::Inactive));

    assert_eq!(admin.process_next().await, Some(ViewUpdate::Changed));
    assert_eq!(status_of(&admin), Some(AccountStatus::Inactive));
    assert_eq!(api.with(|s| s.users[2].status), AccountStatus::Inactive);
    assert_eq!(admin.process_next().await, None);
}

#[tokio::test]
async fn test_admin_rejected_toggle_rolls_back() {
    let api = FakeApi::new();
    seed_users(&api);
    api.with(|s| s.status_error = Some(AuraError::validation("Không thể khóa tài khoản")));
    let ctx = signed_in(api, Some(Role::Admin));
    let Ok(mut admin) = AdminDashboardController::mount(ctx).await else {
        panic!("admin dashboard refused");
    };

    admin.toggle_user_status("u1").unwrap();
    assert_eq!(admin.process_next().await, Some(ViewUpdate::Changed));

    let view = admin.view();
    let user = view.users.iter().find(|u| u.id == "u1").unwrap();
    assert_eq!(user.status, AccountStatus::Active);
    assert_eq!(view.error.as_deref(), Some("Không thể khóa tài khoản"));
}
