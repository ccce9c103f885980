use profile_refresh::automation::StepSequencer;
use profile_refresh::errors::AutomationError;
use profile_refresh::testing::{
    portal_config, portal_url, FixtureBrowser, FixtureDocument, FixtureSite, LoginBehavior,
    DASHBOARD_PATH,
};
use profile_refresh::types::{ClickMode, RunPhase, StepResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const THEMED_MODAL: &str = r#"<html><body>
<div class="modal">
  <em class="icon edit">editOneTheme</em>
  <button id="saveBasicDetailsBtn">Save</button>
</div>
</body></html>"#;

fn sequencer_for(site: &Arc<FixtureSite>) -> StepSequencer<FixtureBrowser> {
    let site = site.clone();
    StepSequencer::new(move || site.browser(), portal_config()).unwrap()
}

fn dashboard_login() -> LoginBehavior {
    LoginBehavior::Navigate(portal_url(DASHBOARD_PATH))
}

#[tokio::test(start_paused = true)]
async fn happy_path_saves_the_profile() {
    let site = Arc::new(FixtureSite::portal(
        FixtureDocument::new(THEMED_MODAL),
        dashboard_login(),
    ));

    let report = sequencer_for(&site).run().await.unwrap();

    assert!(report.reached_done());
    assert_eq!(report.recoverable_failures(), 0);
    assert_eq!(report.edit_strategy.as_deref(), Some("filtered locator"));
    assert_eq!(report.result_of(RunPhase::OpeningEditModal), Some(StepResult::Succeeded));
    assert_eq!(report.result_of(RunPhase::ResolvingEditControl), Some(StepResult::Succeeded));
    assert_eq!(report.result_of(RunPhase::ActivatingEditControl), Some(StepResult::Succeeded));
    assert_eq!(report.result_of(RunPhase::ActivatingSaveControl), Some(StepResult::Succeeded));

    let fills = site.fills();
    assert_eq!(fills[0], ("#usernameField".to_string(), "candidate@example.com".to_string()));
    assert_eq!(fills[1].0, "#passwordField");

    let targets: Vec<String> = site.clicks().into_iter().map(|c| c.target).collect();
    assert_eq!(targets.len(), 3);
    assert_eq!(targets[0], "button[type='submit']");
    assert!(targets[1].starts_with("em.icon.edit"));
    assert!(targets[2].starts_with("#saveBasicDetailsBtn"));

    assert_eq!(
        site.visits(),
        vec![
            portal_url("/nlogin/login"),
            portal_url(DASHBOARD_PATH),
            portal_url("/mnjuser/profile"),
            portal_url("/mnjuser/profile?action=modalOpen"),
        ]
    );
    assert_eq!((site.launches(), site.closes()), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn steps_run_in_pipeline_order() {
    let site = Arc::new(FixtureSite::portal(
        FixtureDocument::new(THEMED_MODAL),
        dashboard_login(),
    ));

    let report = sequencer_for(&site).run().await.unwrap();
    let phases: Vec<RunPhase> = report.steps.iter().map(|s| s.phase).collect();

    assert_eq!(
        phases,
        vec![
            RunPhase::Init,
            RunPhase::LoggingIn,
            RunPhase::AwaitingDashboard,
            RunPhase::NavigatingToProfile,
            RunPhase::OpeningEditModal,
            RunPhase::ResolvingEditControl,
            RunPhase::ActivatingEditControl,
            RunPhase::AwaitingSaveReady,
            RunPhase::ActivatingSaveControl,
            RunPhase::Done,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn continues_on_the_tab_the_site_opened() {
    let site = Arc::new(
        FixtureSite::portal(
            FixtureDocument::new(THEMED_MODAL),
            LoginBehavior::NewTab {
                here: portal_url("/nlogin/login?redirected=1"),
                tab: portal_url(DASHBOARD_PATH),
            },
        )
        .route(portal_url("/nlogin/login?redirected=1"), FixtureDocument::new("<p>bye</p>")),
    );

    let report = sequencer_for(&site).run().await.unwrap();

    assert_eq!(
        report.result_of(RunPhase::AwaitingDashboard),
        Some(StepResult::FailedRecoverable)
    );
    assert!(report.reached_done());
    let clicks = site.clicks();
    assert_eq!(clicks[0].page, 0);
    assert!(clicks[1..].iter().all(|c| c.page == 1));
}

#[tokio::test(start_paused = true)]
async fn edit_control_inside_a_frame() {
    let modal = FixtureDocument::new(
        r#"<html><body><iframe src="editor"></iframe><button id="saveBasicDetailsBtn">Save</button></body></html>"#,
    )
    .with_frame(r#"<em class="icon edit">editOneTheme</em>"#);
    let site = Arc::new(FixtureSite::portal(modal, dashboard_login()));

    let report = sequencer_for(&site).run().await.unwrap();

    assert_eq!(report.edit_strategy.as_deref(), Some("iframe search"));
    assert_eq!(
        report.result_of(RunPhase::ResolvingEditControl),
        Some(StepResult::SucceededWithFallback)
    );
    assert_eq!(
        report.result_of(RunPhase::ActivatingEditControl),
        Some(StepResult::SucceededWithFallback)
    );
    assert!(report.reached_done());
}

#[tokio::test(start_paused = true)]
async fn save_that_never_enables_is_forced() {
    let modal = FixtureDocument::new(
        r#"<html><body><em class="icon edit">editOneTheme</em><button id="saveBasicDetailsBtn" disabled>Save</button></body></html>"#,
    );
    let site = Arc::new(FixtureSite::portal(modal, dashboard_login()));

    let started = Instant::now();
    let report = sequencer_for(&site).run().await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(
        report.result_of(RunPhase::AwaitingSaveReady),
        Some(StepResult::FailedRecoverable)
    );
    assert_eq!(
        report.result_of(RunPhase::ActivatingSaveControl),
        Some(StepResult::SucceededWithFallback)
    );
    let last = site.clicks().pop().unwrap();
    assert_eq!(last.mode, ClickMode::Forced);
    assert!(last.target.starts_with("#saveBasicDetailsBtn"));
}

#[tokio::test(start_paused = true)]
async fn missing_save_control_is_fatal() {
    let modal = FixtureDocument::new(
        r#"<html><body><em class="icon edit">editOneTheme</em></body></html>"#,
    );
    let site = Arc::new(FixtureSite::portal(modal, dashboard_login()));

    let err = sequencer_for(&site).run().await.unwrap_err();

    assert!(matches!(err, AutomationError::SaveNotActivated(_)));
    assert_eq!(site.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn unresolvable_edit_control_ends_the_run() {
    let modal = FixtureDocument::new(
        r#"<html><body><button id="saveBasicDetailsBtn">Save</button></body></html>"#,
    );
    let site = Arc::new(FixtureSite::portal(modal, dashboard_login()));

    let err = sequencer_for(&site).run().await.unwrap_err();

    assert!(matches!(err, AutomationError::NotResolvable { .. }));
    assert_eq!(err.phase(), Some(RunPhase::ResolvingEditControl));
    assert!(site
        .clicks()
        .iter()
        .all(|c| !c.target.contains("saveBasicDetailsBtn")));
    assert_eq!(site.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn hanging_login_page_hits_its_ceiling() {
    let site = Arc::new(
        FixtureSite::portal(FixtureDocument::new(THEMED_MODAL), dashboard_login())
            .hang(portal_url("/nlogin/login")),
    );

    let started = Instant::now();
    let err = sequencer_for(&site).run().await.unwrap_err();

    assert_eq!(err.to_string(), "logging in exceeded its 60s ceiling");
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert!(started.elapsed() < Duration::from_secs(61));
    assert_eq!((site.launches(), site.closes()), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn hanging_new_page_hits_the_launch_ceiling() {
    let site = Arc::new(
        FixtureSite::portal(FixtureDocument::new(THEMED_MODAL), dashboard_login())
            .hanging_new_page(),
    );

    let started = Instant::now();
    let err = sequencer_for(&site).run().await.unwrap_err();

    assert_eq!(err.to_string(), "launching the browser exceeded its 60s ceiling");
    assert_eq!(err.phase(), Some(RunPhase::Init));
    assert!(started.elapsed() < Duration::from_secs(61));
    assert_eq!((site.launches(), site.closes()), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn stuck_close_does_not_hold_up_the_run() {
    let site = Arc::new(
        FixtureSite::portal(FixtureDocument::new(THEMED_MODAL), dashboard_login())
            .hanging_close(),
    );

    let started = Instant::now();
    let report = sequencer_for(&site).run().await.unwrap();

    assert!(report.reached_done());
    assert_eq!(site.closes(), 1);
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(started.elapsed() < Duration::from_secs(32));
}

#[tokio::test(start_paused = true)]
async fn rejected_login_is_fatal() {
    let site = Arc::new(FixtureSite::portal(
        FixtureDocument::new(THEMED_MODAL),
        LoginBehavior::Reject,
    ));

    let err = sequencer_for(&site).run().await.unwrap_err();

    assert!(matches!(
        err,
        AutomationError::LoginRejected(ref url) if url.ends_with("/nlogin/login")
    ));
    assert_eq!(site.visits().len(), 1);
    assert_eq!(site.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn wrong_profile_address_is_fatal() {
    let site = Arc::new(
        FixtureSite::portal(FixtureDocument::new(THEMED_MODAL), dashboard_login())
            .route(portal_url("/mnjuser/profile"), FixtureDocument::new("<p>profile</p>")),
    );
    let mut config = portal_config();
    config.site.profile_pattern = r"(?i)mnjuser/settings".to_string();
    let sequencer = {
        let site = site.clone();
        StepSequencer::new(move || site.browser(), config).unwrap()
    };

    let err = sequencer.run().await.unwrap_err();

    match err {
        AutomationError::UnexpectedAddress { phase, actual, .. } => {
            assert_eq!(phase, RunPhase::NavigatingToProfile);
            assert_eq!(actual, portal_url("/mnjuser/profile"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn missing_credentials_never_launch_a_browser() {
    let site = Arc::new(FixtureSite::portal(
        FixtureDocument::new(THEMED_MODAL),
        dashboard_login(),
    ));
    let mut config = portal_config();
    config.credentials = None;
    let sequencer = {
        let site = site.clone();
        StepSequencer::new(move || site.browser(), config).unwrap()
    };

    let err = sequencer.run().await.unwrap_err();

    assert!(matches!(err, AutomationError::MissingCredentials));
    assert_eq!(site.launches(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_launch_is_reported_as_init_failure() {
    let site = Arc::new(
        FixtureSite::portal(FixtureDocument::new(THEMED_MODAL), dashboard_login())
            .failing_launch(),
    );

    let err = sequencer_for(&site).run().await.unwrap_err();

    assert_eq!(err.phase(), Some(RunPhase::Init));
    assert!(err.to_string().contains("Browser launch failed"));
}
