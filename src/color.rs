//! Color token decoding and palette harmony.
//!
//! Tokens come straight out of inline `style` attributes, so decoding is
//! tolerant: anything that is not a hex triplet/sextet or an `rgb()`/`rgba()`
//! call yields `None` and is dropped by the caller.

/// Harmony assigned when there is not enough evidence to judge a palette.
pub const NEUTRAL_HARMONY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl Rgb {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }

    /// Standard RGB -> HSL. Achromatic colors get hue 0.
    pub fn to_hsl(self) -> Hsl {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let lightness = (max + min) / 2.0;
        if max == min {
            return Hsl {
                hue: 0.0,
                saturation: 0.0,
                lightness,
            };
        }
        let d = max - min;
        let saturation = if lightness > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let sector = if max == self.r {
            (self.g - self.b) / d
        } else if max == self.g {
            2.0 + (self.b - self.r) / d
        } else {
            4.0 + (self.r - self.g) / d
        };
        Hsl {
            hue: (sector / 6.0).rem_euclid(1.0),
            saturation,
            lightness,
        }
    }
}

pub fn parse_hex_color(value: &str) -> Option<Rgb> {
    let s = value.trim().strip_prefix('#')?;
    // from_str_radix alone would accept a sign such as "+f".
    if !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let hex = match s.len() {
        3 => {
            let mut out = String::with_capacity(6);
            for ch in s.chars() {
                out.push(ch);
                out.push(ch);
            }
            out
        }
        6 => s.to_string(),
        _ => return None,
    };

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Rgb::from_u8(r, g, b))
}

/// `rgb(...)` / `rgba(...)`: the first three numeric components are read as
/// 0-255 channels. Comma and space separated forms are both accepted.
pub fn parse_rgb_function(value: &str) -> Option<Rgb> {
    let lower = value.trim().to_ascii_lowercase();
    let inner = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))?;
    let inner = inner.trim_end().trim_end_matches(')');
    let mut channels = inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .take(3)
        .map(|part| part.parse::<f64>().ok().filter(|v| v.is_finite()));
    let r = channels.next()??;
    let g = channels.next()??;
    let b = channels.next()??;
    Some(Rgb::new(
        r.clamp(0.0, 255.0) / 255.0,
        g.clamp(0.0, 255.0) / 255.0,
        b.clamp(0.0, 255.0) / 255.0,
    ))
}

pub fn decode_color_token(token: &str) -> Option<Rgb> {
    let token = token.trim();
    if token.starts_with('#') {
        return parse_hex_color(token);
    }
    parse_rgb_function(token)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub hue: Option<f64>,
    pub saturation: f64,
    pub lightness: f64,
    pub weight: f64,
}

impl ColorSample {
    /// Non-positive or non-finite weights fall back to 1.
    pub fn from_token(token: &str, weight: f64) -> Self {
        let weight = if weight.is_finite() && weight > 0.0 {
            weight
        } else {
            1.0
        };
        match decode_color_token(token).map(Rgb::to_hsl) {
            Some(hsl) => Self {
                hue: Some(hsl.hue),
                saturation: hsl.saturation,
                lightness: hsl.lightness,
                weight,
            },
            None => Self {
                hue: None,
                saturation: 0.0,
                lightness: 0.0,
                weight,
            },
        }
    }

    pub fn is_decoded(&self) -> bool {
        self.hue.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonyAssessment {
    pub harmony: f64,
    pub mean_distance: Option<f64>,
    pub decoded: usize,
    pub discarded: usize,
}

impl HarmonyAssessment {
    /// Fewer than two decoded hues: harmony is neutral and not evidence.
    pub fn is_conclusive(&self) -> bool {
        self.mean_distance.is_some()
    }
}

/// Weighted mean of `|h_i - h_j|` over unordered pairs; each pair is weighted
/// by the mean of its two weights. No wraparound at the 0/1 boundary.
pub fn weighted_hue_distance(samples: &[(f64, f64)]) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for (i, (hue_a, weight_a)) in samples.iter().enumerate() {
        for (hue_b, weight_b) in &samples[i + 1..] {
            let pair_weight = (weight_a + weight_b) / 2.0;
            weighted_sum += (hue_a - hue_b).abs() * pair_weight;
            weight_sum += pair_weight;
        }
    }
    if weight_sum <= 0.0 {
        return None;
    }
    Some(weighted_sum / weight_sum)
}

pub fn harmony_from_distance(distance: f64) -> f64 {
    if !(0.05..=0.5).contains(&distance) {
        0.3
    } else if (0.1..=0.3).contains(&distance) {
        1.0
    } else {
        0.7
    }
}

pub fn assess_harmony(samples: &[ColorSample]) -> HarmonyAssessment {
    let decoded: Vec<(f64, f64)> = samples
        .iter()
        .filter_map(|s| s.hue.map(|hue| (hue, s.weight)))
        .collect();
    let discarded = samples.len() - decoded.len();
    match weighted_hue_distance(&decoded) {
        Some(distance) => HarmonyAssessment {
            harmony: harmony_from_distance(distance),
            mean_distance: Some(distance),
            decoded: decoded.len(),
            discarded,
        },
        None => HarmonyAssessment {
            harmony: NEUTRAL_HARMONY,
            mean_distance: None,
            decoded: decoded.len(),
            discarded,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9
    }

    #[test]
    fn hex_forms_decode_to_expected_hues() {
        let red = decode_color_token("#ff0000").expect("red").to_hsl();
        let green = decode_color_token("#0F0").expect("green").to_hsl();
        let blue = decode_color_token("#0000ff").expect("blue").to_hsl();
        assert!(approx_eq(red.hue, 0.0));
        assert!(approx_eq(green.hue, 1.0 / 3.0));
        assert!(approx_eq(blue.hue, 2.0 / 3.0));
        assert!(approx_eq(red.saturation, 1.0));
        assert!(approx_eq(red.lightness, 0.5));
    }

    #[test]
    fn magenta_hue_wraps_into_unit_interval() {
        let magenta = decode_color_token("#ff00ff").expect("magenta").to_hsl();
        assert!(approx_eq(magenta.hue, 5.0 / 6.0), "got {}", magenta.hue);
    }

    #[test]
    fn rgb_functions_read_first_three_channels() {
        let comma = decode_color_token("rgb(0, 0, 255)").expect("comma form");
        let alpha = decode_color_token("RGBA(0,0,255,0.5)").expect("alpha form");
        let spaced = decode_color_token("rgb(0 0 255 / 50%)").expect("space form");
        assert_eq!(comma, alpha);
        assert_eq!(comma, spaced);
        assert!(approx_eq(comma.to_hsl().hue, 2.0 / 3.0));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in ["red", "#ff00", "#gggggg", "rgb(1,2)", "rgb(a,b,c)", "hsl(0,100%,50%)", "", "#"] {
            assert!(decode_color_token(token).is_none(), "{token:?} decoded");
        }
    }

    #[test]
    fn signed_hex_digits_are_rejected() {
        for token in ["#+fffff", "#+f+f+f", "#-12345", "#+ff"] {
            assert!(parse_hex_color(token).is_none(), "{token:?} decoded");
        }
        assert!(ColorSample::from_token("#+fffff", 1.0).hue.is_none());
    }

    #[test]
    fn grays_are_achromatic() {
        let gray = decode_color_token("#808080").expect("gray").to_hsl();
        assert_eq!(gray.hue, 0.0);
        assert_eq!(gray.saturation, 0.0);
    }

    #[test]
    fn sample_weight_never_zero() {
        assert_eq!(ColorSample::from_token("#fff", 0.0).weight, 1.0);
        assert_eq!(ColorSample::from_token("#fff", f64::NAN).weight, 1.0);
        assert_eq!(ColorSample::from_token("#fff", 12.5).weight, 12.5);
        assert!(!ColorSample::from_token("nope", 3.0).is_decoded());
    }

    #[test]
    fn fewer_than_two_hues_is_neutral() {
        let single = [ColorSample::from_token("#ff0000", 1.0)];
        let assessment = assess_harmony(&single);
        assert_eq!(assessment.harmony, NEUTRAL_HARMONY);
        assert!(!assessment.is_conclusive());

        let with_garbage = [
            ColorSample::from_token("#ff0000", 1.0),
            ColorSample::from_token("tomato", 1.0),
        ];
        let assessment = assess_harmony(&with_garbage);
        assert!(!assessment.is_conclusive());
        assert_eq!(assessment.discarded, 1);
    }

    #[test]
    fn red_and_green_fall_in_the_acceptable_band() {
        let samples = [
            ColorSample::from_token("#ff0000", 1.0),
            ColorSample::from_token("#00ff00", 1.0),
        ];
        let assessment = assess_harmony(&samples);
        let distance = assessment.mean_distance.expect("two hues");
        assert!(approx_eq(distance, 1.0 / 3.0));
        assert_eq!(assessment.harmony, 0.7);
    }

    #[test]
    fn distance_bands() {
        assert_eq!(harmony_from_distance(0.0), 0.3);
        assert_eq!(harmony_from_distance(0.049), 0.3);
        assert_eq!(harmony_from_distance(0.05), 0.7);
        assert_eq!(harmony_from_distance(0.1), 1.0);
        assert_eq!(harmony_from_distance(0.3), 1.0);
        assert_eq!(harmony_from_distance(0.31), 0.7);
        assert_eq!(harmony_from_distance(0.5), 0.7);
        assert_eq!(harmony_from_distance(0.51), 0.3);
    }

    #[test]
    fn pair_weights_use_mean_of_both_samples() {
        // Pairs: (0,0.2) w=2, (0,0.6) w=5.5, (0.2,0.6) w=6.5
        let samples = [(0.0, 1.0), (0.2, 3.0), (0.6, 10.0)];
        let expected = (0.2 * 2.0 + 0.6 * 5.5 + 0.4 * 6.5) / (2.0 + 5.5 + 6.5);
        let got = weighted_hue_distance(&samples).expect("three hues");
        assert!(approx_eq(got, expected), "got {got}, expected {expected}");
    }

    #[test]
    fn hue_distance_does_not_wrap() {
        // 0.02 and 0.98 are neighbours on the wheel but far apart here.
        let got = weighted_hue_distance(&[(0.02, 1.0), (0.98, 1.0)]).expect("pair");
        assert!(approx_eq(got, 0.96));
        assert_eq!(harmony_from_distance(got), 0.3);
    }
}
