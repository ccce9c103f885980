//! The refresh pipeline: log in, open the profile editor, save.
//!
//! Every step has its own ceiling. Steps marked non-fatal record
//! `FailedRecoverable` and let the pipeline carry on; anything else ends the
//! run, and the browser is released either way.

use super::resolver::{bounded, ElementResolver, ResolutionTarget};
use crate::browser::{BrowserSession, ElementMonitor, NavigationManager, NavigationResult};
use crate::core::{BrowserTrait, Config, Credentials, PageSurface};
use crate::dom::ElementHandle;
use crate::errors::{AutomationError, ConfigError, Result, RunResult};
use crate::types::{ClickMode, RunPhase, RunReport, StepResult};
use async_trait::async_trait;
use regex::Regex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// Anything that can perform one refresh run.
#[async_trait]
pub trait Automation: Send + Sync {
    async fn run(&self) -> RunResult<RunReport>;
}

type BrowserFactory<B> = Box<dyn Fn() -> B + Send + Sync>;

pub struct StepSequencer<B: BrowserTrait> {
    make_browser: BrowserFactory<B>,
    config: Config,
    login_url: Url,
    profile_url: Url,
    modal_url: Url,
    profile_address: Regex,
    modal_address: Regex,
    edit_target: ResolutionTarget,
    resolver: ElementResolver,
}

impl<B: BrowserTrait + 'static> StepSequencer<B> {
    /// `make_browser` is called once per run; every run gets a fresh,
    /// unlaunched browser.
    pub fn new<F>(make_browser: F, config: Config) -> std::result::Result<Self, ConfigError>
    where
        F: Fn() -> B + Send + Sync + 'static,
    {
        let site = &config.site;
        let edit_target = ResolutionTarget::themed_edit_control(
            &site.edit_control,
            &site.edit_theme,
            &config.timeouts,
        );

        Ok(Self {
            login_url: site.login_url()?,
            profile_url: site.profile_url()?,
            modal_url: site.modal_url()?,
            profile_address: site.profile_regex()?,
            modal_address: site.modal_regex()?,
            edit_target,
            resolver: ElementResolver::new(),
            make_browser: Box::new(make_browser),
            config,
        })
    }

    pub async fn run(&self) -> RunResult<RunReport> {
        let run_id = Uuid::new_v4();
        self.run_session(run_id)
            .instrument(info_span!("run", %run_id))
            .await
    }

    async fn run_session(&self, run_id: Uuid) -> RunResult<RunReport> {
        let mut report = RunReport::new(run_id);
        let mut session = BrowserSession::new((self.make_browser)(), run_id);
        info!("🚀 Starting profile refresh");

        let outcome = self.drive(&mut session, &mut report).await;
        session.close(self.config.timeouts.close).await;

        match outcome {
            Ok(()) => {
                report.finish();
                info!(
                    edit_strategy = report.edit_strategy.as_deref().unwrap_or("-"),
                    recoverable_failures = report.recoverable_failures(),
                    "✅ Profile updated successfully"
                );
                Ok(report)
            }
            Err(e) => {
                let phase = e.phase().unwrap_or(RunPhase::Failed);
                report.record(phase, StepResult::FailedFatal, Some(e.to_string()));
                error!(phase = %phase, steps = report.steps.len(), "❌ Run failed: {}", e);
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        session: &mut BrowserSession<B>,
        report: &mut RunReport,
    ) -> RunResult<()> {
        let credentials = self
            .config
            .credentials
            .as_ref()
            .ok_or(AutomationError::MissingCredentials)?;

        let timeouts = &self.config.timeouts;
        step(RunPhase::Init, timeouts.launch, session.launch(&self.config.browser)).await?;
        let page = step(RunPhase::Init, timeouts.launch, session.new_page()).await?;
        report.record(RunPhase::Init, StepResult::Succeeded, None);

        self.log_in(page.as_ref(), credentials, report).await?;

        let page = self.await_dashboard(session, page, report).await;
        self.open_profile(page.as_ref(), report).await?;
        self.edit_profile(page.as_ref(), report).await?;
        self.save_profile(page.as_ref(), report).await
    }

    async fn log_in(
        &self,
        page: &B::Page,
        credentials: &Credentials,
        report: &mut RunReport,
    ) -> RunResult<()> {
        let phase = RunPhase::LoggingIn;
        let timeouts = &self.config.timeouts;
        let site = &self.config.site;

        info!(url = %self.login_url, "Opening login page");
        step(phase, timeouts.login_page, page.goto(self.login_url.as_str())).await?;
        step(phase, timeouts.fill, page.fill(&site.username_field, &credentials.username)).await?;
        step(phase, timeouts.fill, page.fill(&site.password_field, &credentials.password)).await?;

        let before = step(phase, timeouts.fill, page.current_url()).await?;
        step(phase, timeouts.login_navigation, page.click_selector(&site.submit_button)).await?;

        let landed =
            NavigationManager::wait_for_address_change(page, &before, timeouts.login_navigation)
                .await;
        if !landed.success {
            return Err(AutomationError::LoginRejected(landed.url));
        }

        info!(url = %landed.url, duration_ms = landed.duration_ms, "Logged in");
        report.record(phase, StepResult::Succeeded, Some(landed.url));
        Ok(())
    }

    /// Never fails: a missing dashboard marker is logged and the run goes on
    /// with whichever page looks current.
    async fn await_dashboard(
        &self,
        session: &BrowserSession<B>,
        page: Arc<B::Page>,
        report: &mut RunReport,
    ) -> Arc<B::Page> {
        let marker = self.config.site.dashboard_locator();
        let found = ElementMonitor::wait_for_element(
            page.as_ref(),
            &marker,
            None,
            self.config.timeouts.dashboard,
        )
        .await;

        if found {
            debug!("dashboard loaded");
            report.record(RunPhase::AwaitingDashboard, StepResult::Succeeded, None);
        } else {
            info!("Dashboard header not found, maybe opened in new tab");
            report.record(
                RunPhase::AwaitingDashboard,
                StepResult::FailedRecoverable,
                Some(format!("{} not found", marker)),
            );
        }

        session.active_page(page).await
    }

    async fn open_profile(&self, page: &B::Page, report: &mut RunReport) -> RunResult<()> {
        let phase = RunPhase::NavigatingToProfile;
        let timeouts = &self.config.timeouts;

        info!(url = %self.profile_url, "Navigating to profile page");
        step(phase, timeouts.profile_page, page.goto(self.profile_url.as_str())).await?;
        self.confirm_address(page, phase, &self.profile_address).await?;

        info!(url = %self.modal_url, "Opening profile editor");
        step(phase, timeouts.profile_page, page.goto(self.modal_url.as_str())).await?;
        let landed = self.confirm_address(page, phase, &self.modal_address).await?;

        report.record(phase, StepResult::Succeeded, Some(landed.url));
        Ok(())
    }

    async fn confirm_address(
        &self,
        page: &B::Page,
        phase: RunPhase,
        pattern: &Regex,
    ) -> RunResult<NavigationResult> {
        let ceiling = self.config.timeouts.address_confirmation;
        let landed = NavigationManager::wait_for_url(page, pattern, ceiling).await;
        if landed.success {
            Ok(landed)
        } else {
            Err(AutomationError::UnexpectedAddress {
                phase,
                expected: pattern.as_str().to_string(),
                actual: landed.url,
            })
        }
    }

    /// The editor is open once the edit control has been clicked, so all
    /// three steps are recorded from the resolver's outcome.
    async fn edit_profile(&self, page: &B::Page, report: &mut RunReport) -> RunResult<()> {
        let resolution = self.resolver.resolve(&self.edit_target, page).await?;
        let strategy = resolution.strategy.to_string();

        report.record(RunPhase::OpeningEditModal, StepResult::Succeeded, None);
        report.record(RunPhase::ResolvingEditControl, resolution.result, Some(strategy.clone()));
        report.record(RunPhase::ActivatingEditControl, resolution.result, Some(strategy.clone()));
        report.edit_strategy = Some(strategy);
        Ok(())
    }

    async fn save_profile(&self, page: &B::Page, report: &mut RunReport) -> RunResult<()> {
        let timeouts = &self.config.timeouts;
        let save = ElementHandle::first(self.config.site.save_locator(), None);

        let present =
            ElementMonitor::wait_for_element(page, &save.locator, None, timeouts.save_presence)
                .await;
        if !present {
            warn!(element = %save, "save control not present yet");
        }
        tokio::time::sleep(timeouts.save_settle).await;

        if let Err(e) = bounded(timeouts.save_click, page.scroll_into_view(&save)).await {
            debug!("could not scroll save control into view: {}", e);
        }

        let enabled = ElementMonitor::wait_until_enabled(page, &save, timeouts.save_enabled).await;
        if !enabled {
            warn!(element = %save, "save control did not become enabled");
        }
        let (readiness, note) = match (present, enabled) {
            (true, true) => (StepResult::Succeeded, None),
            (false, _) => (StepResult::FailedRecoverable, Some("not present".to_string())),
            (true, false) => (StepResult::FailedRecoverable, Some("not enabled".to_string())),
        };
        report.record(RunPhase::AwaitingSaveReady, readiness, note);

        let phase = RunPhase::ActivatingSaveControl;
        match bounded(timeouts.save_click, page.click(&save, ClickMode::Normal)).await {
            Ok(()) => {
                info!("Clicked save");
                report.record(phase, StepResult::Succeeded, None);
                Ok(())
            }
            Err(first) => {
                warn!("normal save click failed, forcing: {}", first);
                bounded(timeouts.save_click, page.click(&save, ClickMode::Forced))
                    .await
                    .map_err(|second| {
                        AutomationError::SaveNotActivated(format!(
                            "normal click: {}; forced click: {}",
                            first, second
                        ))
                    })?;
                info!("Clicked save (forced)");
                report.record(phase, StepResult::SucceededWithFallback, Some("forced".to_string()));
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<B: BrowserTrait + 'static> Automation for StepSequencer<B> {
    async fn run(&self) -> RunResult<RunReport> {
        StepSequencer::run(self).await
    }
}

/// Bounds a fatal step: running out of time names the phase and its ceiling.
async fn step<T, F>(phase: RunPhase, ceiling: Duration, call: F) -> RunResult<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(ceiling, call).await {
        Ok(result) => result.map_err(|source| AutomationError::step(phase, source)),
        Err(_) => Err(AutomationError::StepTimeout { phase, ceiling }),
    }
}
