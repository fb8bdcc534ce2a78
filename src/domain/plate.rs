//! Ishihara plate test types.
//!
//! A `TestSession` is issued once per test run and never changes. Answers
//! are collected separately in a `ResponseSheet` owned by the caller, one
//! plate at a time and strictly in plate order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::OculusError;

/// Plate category, each stressing one axis of colour confusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub enum ColourType {
    /// Type 1: green figure on orange field
    GreenOrange = 1,
    /// Type 2: orange figure on green field
    OrangeGreen = 2,
    /// Type 3: gray figure on red field
    GrayRed = 3,
    /// Type 4: yellow figure on green field
    YellowGreen = 4,
}

impl ColourType {
    /// All types in code order.
    pub const ALL: [ColourType; 4] = [
        Self::GreenOrange,
        Self::OrangeGreen,
        Self::GrayRed,
        Self::YellowGreen,
    ];

    /// Numeric code used on the wire (1-4).
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Zero-based slot for per-type tables.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.code() - 1)
    }

    /// Short label for the confusion axis.
    #[must_use]
    pub fn axis(self) -> &'static str {
        match self {
            Self::GreenOrange => "green vs orange",
            Self::OrangeGreen => "red vs green",
            Self::GrayRed => "red vs gray",
            Self::YellowGreen => "green vs yellow",
        }
    }
}

impl TryFrom<i64> for ColourType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::GreenOrange),
            2 => Ok(Self::OrangeGreen),
            3 => Ok(Self::GrayRed),
            4 => Ok(Self::YellowGreen),
            other => Err(format!("colour type {other} is outside 1-4")),
        }
    }
}

impl From<ColourType> for u8 {
    fn from(t: ColourType) -> Self {
        t.code()
    }
}

impl fmt::Display for ColourType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type {}", self.code())
    }
}

/// One test plate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlate {
    pub id: u32,
    pub filename: String,
    #[serde(rename = "type")]
    pub colour_type: ColourType,
}

/// A single test run: the plates to show, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSession {
    test_id: String,
    plates: Vec<TestPlate>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TestSession {
    /// Create a session from provisioned plates.
    #[must_use]
    pub fn new(test_id: impl Into<String>, plates: Vec<TestPlate>) -> Self {
        Self {
            test_id: test_id.into(),
            plates,
            created_at: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    #[must_use]
    pub fn plates(&self) -> &[TestPlate] {
        &self.plates
    }

    #[must_use]
    pub fn plate(&self, index: usize) -> Option<&TestPlate> {
        self.plates.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    #[must_use]
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }

    /// Start an empty response sheet bound to this session.
    #[must_use]
    pub fn new_sheet(&self) -> ResponseSheet {
        ResponseSheet {
            test_id: self.test_id.clone(),
            responses: Vec::with_capacity(self.plates.len()),
        }
    }

    /// Record the answer for the plate at `plate_index`.
    ///
    /// Plates are answered strictly in order, so `plate_index` must be the
    /// next unanswered plate. A rejected answer leaves `sheet` unchanged.
    ///
    /// # Errors
    /// - `InvalidDigit` if `digit` is outside 0-9
    /// - `SessionComplete` if every plate already has an answer
    /// - `DuplicateResponse` if the plate was already answered
    /// - `InvalidInput` if the sheet belongs to another session or the index
    ///   skips ahead
    pub fn record_response(
        &self,
        sheet: &mut ResponseSheet,
        plate_index: usize,
        digit: i64,
    ) -> crate::Result<()> {
        if sheet.test_id != self.test_id {
            return Err(OculusError::InvalidInput(format!(
                "response sheet belongs to test {}, not {}",
                sheet.test_id, self.test_id
            )));
        }

        let answer = Digit::try_from(digit)?;

        if self.is_complete(sheet) {
            return Err(OculusError::SessionComplete);
        }

        let next = sheet.len();
        if plate_index < next {
            return Err(OculusError::DuplicateResponse { plate_index });
        }
        if plate_index > next {
            return Err(OculusError::InvalidInput(format!(
                "plate {plate_index} cannot be answered before plate {next}"
            )));
        }

        let plate = self.plates.get(plate_index).ok_or_else(|| {
            OculusError::InvalidInput(format!(
                "plate {plate_index} is out of range for a {}-plate test",
                self.plates.len()
            ))
        })?;

        sheet.responses.push(UserResponse {
            filename: plate.filename.clone(),
            user_answer: answer,
        });

        tracing::debug!(
            "Recorded answer for plate {}/{} ({})",
            plate_index + 1,
            self.plates.len(),
            plate.colour_type
        );

        Ok(())
    }

    /// True once every plate has an answer.
    #[must_use]
    pub fn is_complete(&self, sheet: &ResponseSheet) -> bool {
        sheet.len() == self.plates.len()
    }

    /// Check that `sheet` answers exactly this session's plates, in order.
    ///
    /// # Errors
    /// Returns `InvalidInput` describing the first mismatch.
    pub fn verify_sheet(&self, sheet: &ResponseSheet) -> crate::Result<()> {
        if sheet.test_id != self.test_id {
            return Err(OculusError::InvalidInput(format!(
                "response sheet belongs to test {}, not {}",
                sheet.test_id, self.test_id
            )));
        }
        if !self.is_complete(sheet) {
            return Err(OculusError::InvalidInput(format!(
                "{} of {} plates answered",
                sheet.len(),
                self.plates.len()
            )));
        }
        for (i, (plate, response)) in self.plates.iter().zip(sheet.iter()).enumerate() {
            if plate.filename != response.filename {
                return Err(OculusError::InvalidInput(format!(
                    "response {i} is for {}, expected {}",
                    response.filename, plate.filename
                )));
            }
        }
        Ok(())
    }
}

/// A validated answer digit (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Digit(u8);

impl Digit {
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Digit {
    type Error = OculusError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(v) if v <= 9 => Ok(Self(v)),
            _ => Err(OculusError::InvalidDigit(value)),
        }
    }
}

impl From<Digit> for u8 {
    fn from(d: Digit) -> Self {
        d.0
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user's answer to one plate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub filename: String,
    pub user_answer: Digit,
}

/// Ordered answers for one session.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseSheet {
    test_id: String,
    responses: Vec<UserResponse>,
}

impl ResponseSheet {
    #[must_use]
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    #[must_use]
    pub fn responses(&self) -> &[UserResponse] {
        &self.responses
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UserResponse> {
        self.responses.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> TestSession {
        TestSession::new(
            "t-1",
            vec![
                TestPlate {
                    id: 1,
                    filename: "theme_1_01.png".to_string(),
                    colour_type: ColourType::GreenOrange,
                },
                TestPlate {
                    id: 2,
                    filename: "theme_2_07.png".to_string(),
                    colour_type: ColourType::OrangeGreen,
                },
            ],
        )
    }

    #[test]
    fn test_colour_type_codes() {
        for t in ColourType::ALL {
            assert_eq!(ColourType::try_from(i64::from(t.code())), Ok(t));
        }
        assert!(ColourType::try_from(0).is_err());
        assert!(ColourType::try_from(5).is_err());
        assert_eq!(ColourType::YellowGreen.index(), 3);
    }

    #[test]
    fn test_plate_wire_format() {
        let plate: TestPlate =
            serde_json::from_str(r#"{"id": 3, "filename": "theme_3_02.png", "type": 3}"#)
                .expect("Should parse");
        assert_eq!(plate.colour_type, ColourType::GrayRed);

        let bad = serde_json::from_str::<TestPlate>(r#"{"id": 3, "filename": "x.png", "type": 9}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_digit_validation() {
        assert_eq!(Digit::try_from(0).map(Digit::value).ok(), Some(0));
        assert_eq!(Digit::try_from(9).map(Digit::value).ok(), Some(9));
        assert!(matches!(Digit::try_from(10), Err(OculusError::InvalidDigit(10))));
        assert!(matches!(Digit::try_from(-1), Err(OculusError::InvalidDigit(-1))));
    }

    #[test]
    fn test_record_sequential_responses() {
        let session = sample_session();
        let mut sheet = session.new_sheet();

        session.record_response(&mut sheet, 0, 7).expect("Should record");
        assert!(!session.is_complete(&sheet));
        session.record_response(&mut sheet, 1, 3).expect("Should record");
        assert!(session.is_complete(&sheet));

        assert_eq!(sheet.responses()[0].filename, "theme_1_01.png");
        assert_eq!(sheet.responses()[1].user_answer.value(), 3);
        assert!(session.verify_sheet(&sheet).is_ok());
    }

    #[test]
    fn test_rejections_leave_sheet_unchanged() {
        let session = sample_session();
        let mut sheet = session.new_sheet();
        session.record_response(&mut sheet, 0, 5).expect("Should record");

        assert!(matches!(
            session.record_response(&mut sheet, 1, 12),
            Err(OculusError::InvalidDigit(12))
        ));
        assert!(matches!(
            session.record_response(&mut sheet, 0, 4),
            Err(OculusError::DuplicateResponse { plate_index: 0 })
        ));
        assert!(matches!(
            session.record_response(&mut sheet, 5, 4),
            Err(OculusError::InvalidInput(_))
        ));
        assert_eq!(sheet.len(), 1);

        session.record_response(&mut sheet, 1, 4).expect("Should record");
        assert!(matches!(
            session.record_response(&mut sheet, 2, 1),
            Err(OculusError::SessionComplete)
        ));
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn test_sheet_from_other_session_rejected() {
        let session = sample_session();
        let other = TestSession::new("t-2", session.plates().to_vec());
        let mut sheet = other.new_sheet();

        assert!(matches!(
            session.record_response(&mut sheet, 0, 1),
            Err(OculusError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_verify_incomplete_sheet() {
        let session = sample_session();
        let mut sheet = session.new_sheet();
        session.record_response(&mut sheet, 0, 1).expect("Should record");
        assert!(session.verify_sheet(&sheet).is_err());
    }

    #[test]
    fn test_response_wire_format() {
        let session = sample_session();
        let mut sheet = session.new_sheet();
        session.record_response(&mut sheet, 0, 8).expect("Should record");
        let json = serde_json::to_string(&sheet.responses()[0]).expect("Should serialize");
        assert_eq!(json, r#"{"filename":"theme_1_01.png","user_answer":8}"#);
    }
}
