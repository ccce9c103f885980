use profile_refresh::automation::{ElementResolver, ResolutionTarget, StrategyKind};
use profile_refresh::core::{BrowserConfig, BrowserTrait, PageSurface, StepTimeouts};
use profile_refresh::dom::ElementSelector;
use profile_refresh::errors::AutomationError;
use profile_refresh::testing::{
    portal_url, FixtureBrowser, FixtureDocument, FixturePage, FixtureSite, LoginBehavior,
    DASHBOARD_PATH,
};
use profile_refresh::types::{ClickMode, StepResult};
use std::sync::Arc;

const SAVE: &str = r#"<button id="saveBasicDetailsBtn">Save</button>"#;

fn edit_target() -> ResolutionTarget {
    let control = ElementSelector::parse("em.icon.edit").unwrap();
    ResolutionTarget::themed_edit_control(&control, "editOneTheme", &StepTimeouts::default())
}

async fn open_modal(
    modal: FixtureDocument,
) -> (Arc<FixtureSite>, FixtureBrowser, Arc<FixturePage>) {
    let site = Arc::new(FixtureSite::portal(
        modal,
        LoginBehavior::Navigate(portal_url(DASHBOARD_PATH)),
    ));
    let mut browser = site.browser();
    browser.launch(&BrowserConfig::default()).await.unwrap();
    let page = browser.new_page().await.unwrap();
    page.goto(&portal_url("/mnjuser/profile?action=modalOpen"))
        .await
        .unwrap();
    (site, browser, page)
}

async fn resolve_in(
    modal: FixtureDocument,
) -> (Arc<FixtureSite>, Result<StrategyKind, AutomationError>) {
    let (site, _browser, page) = open_modal(modal).await;
    let outcome = ElementResolver::new()
        .resolve(&edit_target(), page.as_ref())
        .await
        .map(|resolution| resolution.strategy);
    (site, outcome)
}

#[tokio::test(start_paused = true)]
async fn themed_control_wins_first() {
    let modal = FixtureDocument::new(format!(
        r#"<div><em class="icon edit">Resume headline</em><em class="icon edit">editOneTheme</em>{SAVE}</div>"#
    ));
    let (site, _browser, page) = open_modal(modal).await;

    let resolution = ElementResolver::new()
        .resolve(&edit_target(), page.as_ref())
        .await
        .unwrap();

    assert_eq!(resolution.strategy, StrategyKind::PrimaryMatch);
    assert_eq!(resolution.result, StepResult::Succeeded);
    let clicks = site.clicks();
    assert_eq!(clicks.len(), 1);
    assert_eq!(clicks[0].mode, ClickMode::Normal);
    assert!(clicks[0].target.contains("has-text"));
}

#[tokio::test(start_paused = true)]
async fn falls_back_to_sibling_of_theme_text() {
    let modal = FixtureDocument::new(
        r#"<div><span>editOneTheme</span><em class="icon edit"></em></div>"#,
    );
    let (site, outcome) = resolve_in(modal).await;

    assert_eq!(outcome.unwrap(), StrategyKind::TextSibling);
    assert_eq!(site.clicks().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn falls_back_to_first_control_on_page() {
    let modal = FixtureDocument::new(
        r#"<div><span>Basic details</span></div><em class="icon edit"></em><em class="icon edit"></em>"#,
    );
    let (site, outcome) = resolve_in(modal).await;

    assert_eq!(outcome.unwrap(), StrategyKind::FirstOfClass);
    assert!(site.clicks()[0].target.ends_with("nth=0"));
}

#[tokio::test(start_paused = true)]
async fn searches_embedded_frames() {
    let modal = FixtureDocument::new("<p>Loading editor</p>")
        .with_frame("<p>ads</p>")
        .with_frame(r#"<em class="icon edit">editOneTheme</em>"#);
    let (site, outcome) = resolve_in(modal).await;

    assert_eq!(outcome.unwrap(), StrategyKind::CrossFrame);
    let clicks = site.clicks();
    assert_eq!(clicks.len(), 1);
    assert!(clicks[0].target.starts_with("frame[1]"));
}

#[tokio::test(start_paused = true)]
async fn forces_a_click_on_hidden_themed_control() {
    let modal = FixtureDocument::new(
        r#"<em class="icon edit" style="display: none">editOneTheme</em>"#,
    );
    let (site, outcome) = resolve_in(modal).await;

    assert_eq!(outcome.unwrap(), StrategyKind::ForcedPrimary);
    let clicks = site.clicks();
    assert_eq!(clicks.len(), 1);
    assert_eq!(clicks[0].mode, ClickMode::Forced);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_reports_candidates_without_clicking() {
    let modal = FixtureDocument::new(r#"<em class="icon edit" hidden>Photo</em>"#);
    let (site, _browser, page) = open_modal(modal).await;

    let err = ElementResolver::new()
        .resolve(&edit_target(), page.as_ref())
        .await
        .unwrap_err();

    match &err {
        AutomationError::NotResolvable {
            attempts, snapshots, ..
        } => {
            assert_eq!(*attempts, 5);
            assert_eq!(snapshots.len(), 1);
            assert!(snapshots[0].contains("Photo"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("not clickable after 5 strategies"));
    assert!(site.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn no_candidates_at_all() {
    let (site, outcome) = resolve_in(FixtureDocument::new("<p>empty</p>")).await;

    assert!(matches!(
        outcome,
        Err(AutomationError::NotResolvable { ref snapshots, .. }) if snapshots.is_empty()
    ));
    assert!(site.clicks().is_empty());
}
