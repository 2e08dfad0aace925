//! The concrete controls: sliders, the step button and the read-only display.

use std::str::FromStr;

use serde::Deserialize;
use shared::domain::ControlKind;
use tokio::task::JoinHandle;

use crate::{
    element::{
        ControlAttributes, ControlEvent, ControlVariant, ControlView, ElementState, InitialState,
        LifecycleState, ValueElement,
    },
    mapper::{clamp_int, compute_stops, cycle_index, ratio_to_value, snap_to_nearest, StepSet},
};

pub type CcSlider = ValueElement<Slider>;
pub type CcStepButton = ValueElement<StepButton>;
pub type CcDisplay = ValueElement<ValueDisplay>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    /// Position along the track for a pointer `offset` measured from the track's left (or top)
    /// edge. Vertical tracks grow upwards.
    pub fn ratio(self, offset: f64, extent: f64) -> f64 {
        match self {
            Axis::Horizontal => offset / extent,
            Axis::Vertical => 1.0 - offset / extent,
        }
    }
}

pub struct Slider {
    axis: Axis,
    stops: StepSet,
    dragging: bool,
}

impl Slider {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            stops: StepSet::default(),
            dragging: false,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn stops(&self) -> &StepSet {
        &self.stops
    }

    fn value_at(&self, ratio: f64) -> u8 {
        snap_to_nearest(ratio_to_value(ratio), &self.stops)
    }
}

impl ControlVariant for Slider {
    fn kind(&self) -> ControlKind {
        match self.axis {
            Axis::Horizontal => ControlKind::HSlider,
            Axis::Vertical => ControlKind::VSlider,
        }
    }

    fn configure(&mut self, attributes: &ControlAttributes) {
        self.stops = attributes
            .step
            .as_deref()
            .map(StepSet::parse)
            .unwrap_or_default();
    }

    fn initial_value(&mut self, fetched: i64) -> InitialState {
        let cached = snap_to_nearest(clamp_int(fetched), &self.stops);
        InitialState {
            cached,
            view: ControlView::Level { value: cached },
        }
    }

    fn release(&mut self) {
        self.dragging = false;
    }
}

impl ValueElement<Slider> {
    /// Captures the pointer and applies its position. Returns the push task if the value
    /// changed.
    pub async fn pointer_down(&self, ratio: f64) -> Option<JoinHandle<()>> {
        let mut inner = self.inner.lock().await;
        if !inner.connected {
            return None;
        }
        inner.variant.dragging = true;
        self.apply_pointer(&mut inner, ratio)
    }

    /// Applies a pointer position while the pointer is captured.
    pub async fn pointer_move(&self, ratio: f64) -> Option<JoinHandle<()>> {
        let mut inner = self.inner.lock().await;
        if !inner.connected || !inner.variant.dragging {
            return None;
        }
        self.apply_pointer(&mut inner, ratio)
    }

    pub async fn pointer_up(&self) {
        self.inner.lock().await.variant.dragging = false;
    }

    pub async fn is_dragging(&self) -> bool {
        self.inner.lock().await.variant.dragging
    }

    fn apply_pointer(
        &self,
        inner: &mut ElementState<Slider>,
        ratio: f64,
    ) -> Option<JoinHandle<()>> {
        if inner.lifecycle != LifecycleState::Ready {
            return None;
        }
        let candidate = inner.variant.value_at(ratio);
        if inner.value == Some(candidate) {
            return None;
        }
        inner.value = Some(candidate);
        self.emit(ControlEvent::Render {
            view: ControlView::Level { value: candidate },
        });
        Some(self.dispatch_push(inner.identity, candidate))
    }
}

/// Which label a step button shows once the device value is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialIndexPolicy {
    /// Always start at the first label, whatever the device reports.
    #[default]
    FirstStep,
    /// Start at the label whose stop is nearest to the device value.
    NearestStop,
}

impl FromStr for InitialIndexPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_step" | "first-step" => Ok(Self::FirstStep),
            "nearest" | "nearest_stop" | "nearest-stop" => Ok(Self::NearestStop),
            other => Err(format!(
                "unknown initial index policy '{other}', expected 'first' or 'nearest'"
            )),
        }
    }
}

pub struct StepButton {
    steps: StepSet,
    index: usize,
    policy: InitialIndexPolicy,
}

impl StepButton {
    pub fn new(policy: InitialIndexPolicy) -> Self {
        Self {
            steps: StepSet::default(),
            index: 0,
            policy,
        }
    }

    pub fn steps(&self) -> &StepSet {
        &self.steps
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn current_value(&self) -> u8 {
        self.steps.get(self.index).map_or(0, |stop| stop.value)
    }

    fn current_view(&self) -> ControlView {
        let (label, value) = self
            .steps
            .get(self.index)
            .map(|stop| (stop.label.clone(), stop.value))
            .unwrap_or_default();
        ControlView::Step {
            index: self.index,
            label,
            value,
        }
    }
}

impl ControlVariant for StepButton {
    fn kind(&self) -> ControlKind {
        ControlKind::StepButton
    }

    fn configure(&mut self, attributes: &ControlAttributes) {
        let steps = attributes
            .step
            .as_deref()
            .map(StepSet::parse)
            .unwrap_or_default();
        // Without labels the button is static and shows one empty label.
        self.steps = if steps.is_empty() {
            compute_stops([""])
        } else {
            steps
        };
        self.index = 0;
    }

    fn initial_value(&mut self, fetched: i64) -> InitialState {
        let mut cached = clamp_int(fetched);
        if self.policy == InitialIndexPolicy::NearestStop {
            if let Some(index) = self.steps.nearest_index(cached) {
                self.index = index;
                cached = self.steps.get(index).map_or(cached, |stop| stop.value);
            }
        }
        InitialState {
            cached,
            view: self.current_view(),
        }
    }

    fn attached_view(&self) -> Option<ControlView> {
        Some(self.current_view())
    }
}

impl ValueElement<StepButton> {
    /// Advances to the next label and sends its value. Works without a fetched value; a
    /// button without a valid identity reports the failed push instead.
    pub async fn activate(&self) -> Option<JoinHandle<()>> {
        let mut inner = self.inner.lock().await;
        if !inner.connected {
            return None;
        }
        let button = &mut inner.variant;
        button.index = cycle_index(button.index, button.steps.len());
        let value = button.current_value();
        let view = button.current_view();
        inner.value = Some(value);
        self.emit(ControlEvent::Render { view });
        Some(self.dispatch_push(inner.identity, value))
    }

    /// Replaces the label list. The index goes back to the first label.
    pub async fn set_step(&self, step: Option<&str>) {
        let mut inner = self.inner.lock().await;
        inner.attributes.step = step.map(str::to_owned);
        let attributes = inner.attributes.clone();
        inner.variant.configure(&attributes);
        if inner.lifecycle != LifecycleState::Unattached {
            self.emit(ControlEvent::Render {
                view: inner.variant.current_view(),
            });
        }
    }

    pub async fn current_index(&self) -> usize {
        self.inner.lock().await.variant.index
    }
}

/// Shows the device value as text. It has no input of its own.
#[derive(Debug, Default)]
pub struct ValueDisplay;

impl ControlVariant for ValueDisplay {
    fn kind(&self) -> ControlKind {
        ControlKind::Display
    }

    fn configure(&mut self, _attributes: &ControlAttributes) {}

    fn initial_value(&mut self, fetched: i64) -> InitialState {
        InitialState {
            cached: clamp_int(fetched),
            view: ControlView::Text {
                text: fetched.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_ratio_grows_right_and_up() {
        assert_eq!(Axis::Horizontal.ratio(25.0, 100.0), 0.25);
        assert_eq!(Axis::Vertical.ratio(25.0, 100.0), 0.75);
    }

    #[test]
    fn slider_snaps_initial_value_when_stops_are_configured() {
        let mut slider = Slider::new(Axis::Horizontal);
        slider.configure(&ControlAttributes::new("1", "7").with_step("lo,mid,hi"));
        let initial = slider.initial_value(40);
        assert_eq!(initial.cached, 64);
        assert_eq!(initial.view, ControlView::Level { value: 64 });
    }

    #[test]
    fn slider_clamps_initial_value() {
        let mut slider = Slider::new(Axis::Vertical);
        slider.configure(&ControlAttributes::new("1", "7"));
        assert_eq!(slider.initial_value(300).cached, 127);
        assert_eq!(slider.initial_value(-4).cached, 0);
        assert_eq!(slider.kind(), ControlKind::VSlider);
    }

    #[test]
    fn step_button_without_labels_has_one_empty_step() {
        let mut button = StepButton::new(InitialIndexPolicy::FirstStep);
        button.configure(&ControlAttributes::new("1", "7"));
        assert_eq!(button.steps().len(), 1);
        assert_eq!(
            button.attached_view(),
            Some(ControlView::Step {
                index: 0,
                label: String::new(),
                value: 0
            })
        );
    }

    #[test]
    fn first_step_policy_ignores_the_device_value() {
        let mut button = StepButton::new(InitialIndexPolicy::FirstStep);
        button.configure(&ControlAttributes::new("1", "7").with_step("a,b,c"));
        let initial = button.initial_value(127);
        assert_eq!(button.index(), 0);
        assert_eq!(initial.cached, 127);
    }

    #[test]
    fn nearest_stop_policy_reconciles_the_index() {
        let mut button = StepButton::new(InitialIndexPolicy::NearestStop);
        button.configure(&ControlAttributes::new("1", "7").with_step("a,b,c"));
        let initial = button.initial_value(70);
        assert_eq!(button.index(), 1);
        assert_eq!(initial.cached, 64);
        assert_eq!(
            initial.view,
            ControlView::Step {
                index: 1,
                label: "b".into(),
                value: 64
            }
        );
    }

    #[test]
    fn policy_parses_short_and_long_names() {
        assert_eq!(
            "first".parse::<InitialIndexPolicy>(),
            Ok(InitialIndexPolicy::FirstStep)
        );
        assert_eq!(
            "Nearest-Stop".parse::<InitialIndexPolicy>(),
            Ok(InitialIndexPolicy::NearestStop)
        );
        assert!("middle".parse::<InitialIndexPolicy>().is_err());
    }

    #[test]
    fn display_renders_the_raw_value() {
        let mut display = ValueDisplay;
        let initial = display.initial_value(300);
        assert_eq!(initial.cached, 127);
        assert_eq!(
            initial.view,
            ControlView::Text {
                text: "300".into()
            }
        );
    }
}
