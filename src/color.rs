use eframe::egui::Color32;
use palette::{Hsv, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Wavelength gradient
// ---------------------------------------------------------------------------

/// Gradient stop: wavelength, hue in degrees, HSV value.
struct Stop {
    nano_meters: f32,
    hue: f32,
    value: f32,
}

const fn stop(nano_meters: f32, hue: f32, value: f32) -> Stop {
    Stop {
        nano_meters,
        hue,
        value,
    }
}

// violet 380-450 270°, blue 450-485 240°, cyan 485-500 180°, green 500-565
// 120°, yellow 565-590 60°, orange 590-625 30°, red 625-700 0°
const GRADIENT: [Stop; 13] = [
    stop(300.0, 300.0, 0.1),
    stop(380.0, 280.0, 0.4),
    stop(390.0, 280.0, 0.9),
    stop(415.0, 270.0, 1.0),
    stop(468.0, 240.0, 1.0),
    stop(492.0, 180.0, 1.0),
    stop(532.0, 120.0, 1.0),
    stop(577.0, 60.0, 1.0),
    stop(607.0, 30.0, 1.0),
    stop(657.0, 0.0, 1.0),
    stop(690.0, -10.0, 0.9),
    stop(700.0, -10.0, 0.4),
    stop(1200.0, 0.0, 0.1),
];

/// Display colour of a wavelength: the rainbow across the visible range,
/// fading to dark outside it.
pub fn color_for_wave_length(nano_meters: f64) -> Color32 {
    let nm = nano_meters as f32;
    let first = &GRADIENT[0];
    let last = &GRADIENT[GRADIENT.len() - 1];

    let (hue, value) = if nm.is_nan() || nm <= first.nano_meters {
        (first.hue, first.value)
    } else if nm >= last.nano_meters {
        (last.hue, last.value)
    } else {
        let (a, b) = GRADIENT
            .windows(2)
            .map(|pair| (&pair[0], &pair[1]))
            .find(|(a, b)| a.nano_meters <= nm && nm < b.nano_meters)
            .unwrap_or((first, last));
        let t = (nm - a.nano_meters) / (b.nano_meters - a.nano_meters);
        (a.hue + t * (b.hue - a.hue), a.value + t * (b.value - a.value))
    };

    hsv_to_color32(hue, value)
}

/// Same colour with the given opacity, for filled areas.
pub fn translucent(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

fn hsv_to_color32(hue: f32, value: f32) -> Color32 {
    let hsv = Hsv::new(hue.rem_euclid(360.0), 1.0, value.clamp(0.0, 1.0));
    let rgb: Srgb = hsv.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0).round() as u8,
        (rgb.green * 255.0).round() as u8,
        (rgb.blue * 255.0).round() as u8,
    )
}
