//! Fixed-point math utilities for deterministic simulation.
//!
//! All arena simulation uses fixed-point arithmetic so that two machines
//! fed the same seed and action stream produce bit-identical matches.
//! Facing is quantised into [`Heading`] steps so that trigonometry comes
//! from a constant table instead of `f64::sin`.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }

    /// Same encoding for optional values; `None` stays `None`.
    pub mod option {
        use super::Fixed;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        /// Serialize an optional fixed-point number as optional raw bits.
        pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            value.map(Fixed::to_bits).serialize(serializer)
        }

        /// Deserialize an optional fixed-point number from optional raw bits.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Ok(Option::<i64>::deserialize(deserializer)?.map(Fixed::from_bits))
        }
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole-unit coordinates.
    #[must_use]
    pub fn from_int(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Whether `other` lies within `radius` (inclusive) of `self`.
    ///
    /// A negative radius never matches.
    #[must_use]
    pub fn within(self, other: Self, radius: Fixed) -> bool {
        radius >= Fixed::ZERO && self.distance_squared(other) <= radius * radius
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Normalize vector using fixed-point math.
    ///
    /// The zero vector normalizes to zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.dot(self);

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }
}

/// Computes the square root of a fixed-point number using binary search.
///
/// Runs a fixed number of halvings so the result is bit-exact on every
/// platform. Non-positive inputs return zero.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Vec2Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Raw `I32F32` bits of `sin(k * pi / 32)` for `k` in `0..=16`.
const QUARTER_SINE_BITS: [i64; 17] = [
    0,
    420_980_412,
    837_906_553,
    1_246_763_195,
    1_643_612_827,
    2_024_633_568,
    2_386_155_981,
    2_724_698_408,
    3_037_000_500,
    3_320_054_617,
    3_571_134_792,
    3_787_822_988,
    3_968_032_378,
    4_110_027_446,
    4_212_440_704,
    4_274_285_855,
    4_294_967_296,
];

/// Facing direction quantised into [`Heading::STEPS`] steps of `pi / 32`.
///
/// Step 0 faces +x, step 16 faces +y (screen down). Turning wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Heading(u8);

impl Heading {
    /// Number of discrete headings in a full turn.
    pub const STEPS: u8 = 64;

    /// Heading from a step index (wrapped into range).
    #[must_use]
    pub const fn from_step(step: u8) -> Self {
        Self(step % Self::STEPS)
    }

    /// Current step index in `0..STEPS`.
    #[must_use]
    pub const fn step(self) -> u8 {
        self.0
    }

    /// Rotate by a signed number of steps.
    #[must_use]
    pub fn rotate(self, steps: i32) -> Self {
        let turned = (i32::from(self.0) + steps).rem_euclid(i32::from(Self::STEPS));
        // rem_euclid keeps the value in 0..64
        Self(u8::try_from(turned).unwrap_or(0))
    }

    /// Sine of the heading angle.
    #[must_use]
    pub fn sin(self) -> Fixed {
        sine_of_step(self.0)
    }

    /// Cosine of the heading angle.
    #[must_use]
    pub fn cos(self) -> Fixed {
        sine_of_step((self.0 + 16) % Self::STEPS)
    }

    /// Unit vector pointing along the heading.
    #[must_use]
    pub fn unit(self) -> Vec2Fixed {
        Vec2Fixed::new(self.cos(), self.sin())
    }
}

fn sine_of_step(step: u8) -> Fixed {
    let step = usize::from(step % Heading::STEPS);
    let bits = match step {
        0..=16 => QUARTER_SINE_BITS[step],
        17..=32 => QUARTER_SINE_BITS[32 - step],
        33..=48 => -QUARTER_SINE_BITS[step - 32],
        _ => -QUARTER_SINE_BITS[64 - step],
    };
    Fixed::from_bits(bits)
}
