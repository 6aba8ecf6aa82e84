//! SVG timing diagram of a simulated trace.
//!
//! Three lanes share one time axis: the raw contact, the debounced input and
//! the command index. Index pulses are drawn as bars labelled with the media
//! command they would send.

use footswitch_core::Millis;

use crate::simulate::{Pulse, Sample, Simulation};

/// Widest the plot area gets before time is compressed.
const MAX_PLOT_WIDTH: f64 = 1600.0;
/// Lane height in SVG pixels.
const LANE_H: f64 = 40.0;
/// Vertical gap between lanes.
const LANE_GAP: f64 = 30.0;
/// Room on the left for lane names.
const LABEL_W: f64 = 90.0;
const MARGIN: f64 = 20.0;
/// Axis tick spacing in milliseconds.
const TICK_MS: Millis = 100;

const LANES: [&str; 3] = ["raw", "debounced", "index"];

fn lane_top(lane: usize) -> f64 {
    MARGIN + lane as f64 * (LANE_H + LANE_GAP)
}

/// Polyline points for a two-level signal, one corner per transition.
fn square_wave(samples: &[Sample], lane: usize, scale: f64, level: impl Fn(&Sample) -> bool) -> String {
    let top = lane_top(lane);
    let y = |high: bool| if high { top } else { top + LANE_H };

    let mut points = Vec::new();
    let mut prev: Option<bool> = None;
    for s in samples {
        let x = LABEL_W + f64::from(s.t) * scale;
        let cur = level(s);
        match prev {
            None => points.push(format!("{x:.1},{:.1}", y(cur))),
            Some(p) if p != cur => {
                points.push(format!("{x:.1},{:.1}", y(p)));
                points.push(format!("{x:.1},{:.1}", y(cur)));
            }
            _ => {}
        }
        prev = Some(cur);
    }
    if let (Some(last), Some(end_level)) = (samples.last(), prev) {
        let x = LABEL_W + f64::from(last.t) * scale;
        points.push(format!("{x:.1},{:.1}", y(end_level)));
    }
    points.join(" ")
}

fn pulse_label(pulse: &Pulse) -> String {
    match pulse.command {
        Some(cmd) => format!("{} {}", pulse.index, cmd.display_name()),
        None => pulse.index.to_string(),
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render the whole simulation as a standalone SVG document.
pub fn render_svg(sim: &Simulation, max_index: u8) -> String {
    let duration = sim.duration.max(1);
    let scale = (MAX_PLOT_WIDTH / f64::from(duration)).min(1.0);
    let plot_w = f64::from(duration) * scale;
    let width = LABEL_W + plot_w + MARGIN;
    let axis_y = lane_top(LANES.len()) - LANE_GAP / 2.0;
    let height = axis_y + 2.0 * MARGIN;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}">
<style>
  .bg {{ fill: #1a1a2e; }}
  .lane {{ fill: #16213e; }}
  .wave {{ fill: none; stroke: #53a8b6; stroke-width: 1.5; }}
  .pulse {{ fill: #e94560; }}
  .name {{ fill: #eee; font-family: system-ui, sans-serif; font-size: 13px; dominant-baseline: middle; }}
  .tick {{ fill: #888; font-family: monospace; font-size: 10px; text-anchor: middle; }}
  .cmd {{ fill: #e94560; font-family: monospace; font-size: 10px; }}
  .grid {{ stroke: #30365e; stroke-width: 0.5; }}
</style>
<rect class="bg" width="100%" height="100%"/>
"#
    );

    for (lane, name) in LANES.iter().enumerate() {
        let top = lane_top(lane);
        svg.push_str(&format!(
            r#"<rect class="lane" x="{LABEL_W}" y="{top}" width="{plot_w:.1}" height="{LANE_H}"/>"#
        ));
        svg.push_str(&format!(
            r#"<text class="name" x="{MARGIN}" y="{:.1}">{name}</text>"#,
            top + LANE_H / 2.0
        ));
        svg.push('\n');
    }

    for t in (0..=duration).step_by(TICK_MS as usize) {
        let x = LABEL_W + f64::from(t) * scale;
        svg.push_str(&format!(
            r#"<line class="grid" x1="{x:.1}" y1="{MARGIN}" x2="{x:.1}" y2="{axis_y:.1}"/>"#
        ));
        svg.push_str(&format!(
            r#"<text class="tick" x="{x:.1}" y="{:.1}">{t}</text>"#,
            axis_y + 12.0
        ));
    }
    svg.push('\n');

    let raw = square_wave(&sim.samples, 0, scale, |s| s.raw);
    let debounced = square_wave(&sim.samples, 1, scale, |s| s.debounced);
    for points in [raw, debounced] {
        svg.push_str(&format!(r#"<polyline class="wave" points="{points}"/>"#));
        svg.push('\n');
    }

    let index_top = lane_top(2);
    let max_index = f64::from(max_index.max(1));
    for pulse in &sim.pulses {
        let x = LABEL_W + f64::from(pulse.t) * scale;
        let h = LANE_H * f64::from(pulse.index) / max_index;
        svg.push_str(&format!(
            r#"<rect class="pulse" x="{x:.1}" y="{:.1}" width="2" height="{h:.1}"/>"#,
            index_top + LANE_H - h
        ));
        svg.push_str(&format!(
            r#"<text class="cmd" x="{:.1}" y="{:.1}">{}</text>"#,
            x + 4.0,
            index_top - 4.0,
            xml_escape(&pulse_label(pulse))
        ));
        svg.push('\n');
    }

    svg.push_str("</svg>\n");
    svg
}
