//! Finding and clicking a control whose markup is not stable.
//!
//! A [`ResolutionTarget`] carries an ordered list of [`Strategy`] values.
//! [`ElementResolver::resolve`] tries them in order, each with its own
//! bounded waits, and stops at the first one that both finds a candidate and
//! clicks it. A failing strategy never aborts the waterfall.

use crate::browser::ElementMonitor;
use crate::core::{PageSurface, StepTimeouts};
use crate::dom::{ElementHandle, ElementSelector, Locator};
use crate::errors::{AutomationError, BrowserError, Result, RunResult};
use crate::types::{ClickMode, StepResult};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Class match filtered by the theme text
    PrimaryMatch,
    /// Class match next to the element holding the theme text
    TextSibling,
    /// First class match anywhere, ignoring the theme
    FirstOfClass,
    /// The primary match, repeated inside every embedded frame
    CrossFrame,
    /// The primary match clicked without actionability checks
    ForcedPrimary,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::PrimaryMatch => "filtered locator",
            StrategyKind::TextSibling => "text sibling",
            StrategyKind::FirstOfClass => "generic first match",
            StrategyKind::CrossFrame => "iframe search",
            StrategyKind::ForcedPrimary => "forced click",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    MainFrame,
    Frame(usize),
    /// Every embedded frame in turn; the first success wins
    AllFrames,
}

#[derive(Debug, Clone)]
pub struct Strategy {
    pub kind: StrategyKind,
    pub locator: Locator,
    pub scope: Scope,
    /// Wait this long for the candidate to show, then scroll it into view.
    /// `None` goes straight to the click.
    pub visible_within: Option<Duration>,
    pub click: ClickMode,
    pub click_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ResolutionTarget {
    pub name: String,
    /// Everything that could plausibly be the control; snapshotted when all
    /// strategies fail.
    pub candidates: Locator,
    pub strategies: Vec<Strategy>,
}

impl ResolutionTarget {
    /// The edit control of the section tagged `theme`.
    ///
    /// The generic first-of-class strategy can hit another section's control
    /// when several are on the page. It stays third on purpose: finishing the
    /// run matters more than picking the exact section.
    pub fn themed_edit_control(
        control: &ElementSelector,
        theme: &str,
        timeouts: &StepTimeouts,
    ) -> Self {
        let themed = Locator::ElementWithText {
            selector: control.clone(),
            text: theme.to_string(),
        };
        let sibling = Locator::SiblingOfText {
            text: theme.to_string(),
            selector: control.clone(),
        };
        let any = Locator::element(control.clone());

        let strategy =
            |kind, locator: &Locator, scope, visible_within, click, click_timeout| Strategy {
                kind,
                locator: locator.clone(),
                scope,
                visible_within,
                click,
                click_timeout,
            };
        let wait = Some(timeouts.fallback_visibility);

        Self {
            name: format!("edit control ({})", theme),
            candidates: any.clone(),
            strategies: vec![
                strategy(
                    StrategyKind::PrimaryMatch,
                    &themed,
                    Scope::MainFrame,
                    Some(timeouts.primary_visibility),
                    ClickMode::Normal,
                    timeouts.edit_click,
                ),
                strategy(
                    StrategyKind::TextSibling,
                    &sibling,
                    Scope::MainFrame,
                    wait,
                    ClickMode::Normal,
                    timeouts.edit_click,
                ),
                strategy(
                    StrategyKind::FirstOfClass,
                    &any,
                    Scope::MainFrame,
                    wait,
                    ClickMode::Normal,
                    timeouts.edit_click,
                ),
                strategy(
                    StrategyKind::CrossFrame,
                    &themed,
                    Scope::AllFrames,
                    wait,
                    ClickMode::Normal,
                    timeouts.edit_click,
                ),
                strategy(
                    StrategyKind::ForcedPrimary,
                    &themed,
                    Scope::MainFrame,
                    None,
                    ClickMode::Forced,
                    timeouts.forced_edit_click,
                ),
            ],
        }
    }
}

/// The clicked element and the strategy that got there.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub strategy: StrategyKind,
    pub element: ElementHandle,
    /// `SucceededWithFallback` unless the first strategy won
    pub result: StepResult,
}

#[derive(Debug, Default, Clone)]
pub struct ElementResolver;

impl ElementResolver {
    pub fn new() -> Self {
        Self
    }

    pub async fn resolve<P: PageSurface + ?Sized>(
        &self,
        target: &ResolutionTarget,
        page: &P,
    ) -> RunResult<Resolution> {
        for (position, strategy) in target.strategies.iter().enumerate() {
            debug!(target = %target.name, strategy = %strategy.kind, "trying strategy");
            match self.attempt(strategy, page).await {
                Ok(element) => {
                    info!(
                        target = %target.name,
                        strategy = %strategy.kind,
                        element = %element,
                        "Clicked {} via {}",
                        target.name,
                        strategy.kind
                    );
                    let result = if position == 0 {
                        StepResult::Succeeded
                    } else {
                        StepResult::SucceededWithFallback
                    };
                    return Ok(Resolution {
                        strategy: strategy.kind,
                        element,
                        result,
                    });
                }
                Err(e) => {
                    debug!(
                        target = %target.name,
                        strategy = %strategy.kind,
                        "strategy failed: {}",
                        e
                    );
                }
            }
        }

        let snapshots = bounded(SNAPSHOT_TIMEOUT, page.outer_html(&target.candidates, None))
            .await
            .unwrap_or_else(|e| {
                warn!("could not snapshot candidates: {}", e);
                Vec::new()
            });
        warn!(target = %target.name, candidates = ?snapshots, "every strategy failed");

        Err(AutomationError::NotResolvable {
            target: target.name.clone(),
            attempts: target.strategies.len(),
            snapshots,
        })
    }

    async fn attempt<P: PageSurface + ?Sized>(
        &self,
        strategy: &Strategy,
        page: &P,
    ) -> Result<ElementHandle> {
        let frames: Vec<Option<usize>> = match strategy.scope {
            Scope::MainFrame => vec![None],
            Scope::Frame(index) => vec![Some(index)],
            Scope::AllFrames => {
                let count = bounded(strategy.click_timeout, page.frame_count()).await?;
                (0..count).map(Some).collect()
            }
        };

        let mut last_error =
            BrowserError::ElementNotFound(format!("no frame to search for {}", strategy.locator));
        for frame in frames {
            match self.attempt_in(strategy, page, frame).await {
                Ok(element) => return Ok(element),
                Err(e) => {
                    if let Some(index) = frame {
                        debug!(frame = index, "no success in frame: {}", e);
                    }
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn attempt_in<P: PageSurface + ?Sized>(
        &self,
        strategy: &Strategy,
        page: &P,
        frame: Option<usize>,
    ) -> Result<ElementHandle> {
        let found = bounded(strategy.click_timeout, page.count(&strategy.locator, frame)).await?;
        if found == 0 {
            return Err(BrowserError::ElementNotFound(strategy.locator.to_string()));
        }

        let element = ElementHandle::first(strategy.locator.clone(), frame);
        if let Some(within) = strategy.visible_within {
            if !ElementMonitor::wait_until_visible(page, &element, within).await {
                return Err(BrowserError::NotActionable(format!(
                    "{} not visible within {:?}",
                    element, within
                )));
            }
            bounded(strategy.click_timeout, page.scroll_into_view(&element)).await?;
        }

        bounded(strategy.click_timeout, page.click(&element, strategy.click)).await?;
        Ok(element)
    }
}

/// Bounds one driver call; running out of time is an ordinary error here.
pub(crate) async fn bounded<T, F>(ceiling: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(ceiling, call)
        .await
        .map_err(|_| BrowserError::TimeoutError(format!("no answer within {:?}", ceiling)))?
}
