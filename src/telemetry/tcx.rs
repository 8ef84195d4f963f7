// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Streaming TCX (Training Center XML) reader.
//!
//! Only what session statistics need is kept: the first activity's `Id` and,
//! per `Trackpoint`, the `Time`, the first `Watts` reading found at any depth
//! and the `HeartRateBpm/Value` reading. Namespace prefixes are ignored, so
//! `ns3:Watts` inside a `TPX` extension is read the same as a bare `Watts`.

use quick_xml::events::Event;
use quick_xml::Reader;

/// One sample point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSample {
    pub time: Option<String>,
    pub watts: Option<f64>,
    pub heart_rate: Option<f64>,
}

/// Parsed TCX document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TcxSession {
    /// Whether any `Activity` element was present
    pub has_activity: bool,
    /// Text of the first activity's `Id`
    pub session_id: Option<String>,
    pub samples: Vec<TrackSample>,
}

#[derive(Debug, thiserror::Error)]
pub enum TcxError {
    #[error("XML parsing error: {0}")]
    Xml(String),

    #[error("Invalid {element} reading: {value:?}")]
    InvalidReading { element: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Reading {
    Time,
    Watts,
    HeartRate,
    SessionId,
}

impl Reading {
    fn element(self) -> &'static str {
        match self {
            Reading::Time => "Time",
            Reading::Watts => "Watts",
            Reading::HeartRate => "HeartRateBpm/Value",
            Reading::SessionId => "Id",
        }
    }
}

struct TcxBuilder {
    session: TcxSession,
    path: Vec<String>,
    activities_seen: usize,
    current: Option<TrackSample>,
    pending: Option<Reading>,
}

impl TcxBuilder {
    fn new() -> Self {
        Self {
            session: TcxSession::default(),
            path: Vec::new(),
            activities_seen: 0,
            current: None,
            pending: None,
        }
    }

    fn parent(&self) -> Option<&str> {
        self.path.last().map(|s| s.as_str())
    }

    /// Decide which reading, if any, the element about to open carries
    fn reading_for(&self, name: &str) -> Option<Reading> {
        let parent = self.parent();
        match (name, &self.current) {
            ("Id", None) if parent == Some("Activity")
                && self.activities_seen == 1
                && self.session.session_id.is_none() => Some(Reading::SessionId),
            ("Time", Some(sample)) if parent == Some("Trackpoint") && sample.time.is_none() => Some(Reading::Time),
            ("Watts", Some(sample)) if sample.watts.is_none() => Some(Reading::Watts),
            ("Value", Some(sample)) if parent == Some("HeartRateBpm") && sample.heart_rate.is_none() => {
                Some(Reading::HeartRate)
            }
            _ => None,
        }
    }

    fn open(&mut self, name: String) {
        match name.as_str() {
            "Activity" => {
                self.session.has_activity = true;
                self.activities_seen += 1;
            }
            "Trackpoint" => self.current = Some(TrackSample::default()),
            _ => {}
        }
        self.pending = self.reading_for(&name);
        self.path.push(name);
    }

    fn text(&mut self, text: &str) -> Result<(), TcxError> {
        let Some(reading) = self.pending.take() else {
            return Ok(());
        };

        match reading {
            Reading::SessionId => self.session.session_id = Some(text.to_string()),
            Reading::Time => {
                if let Some(sample) = self.current.as_mut() {
                    sample.time = Some(text.to_string());
                }
            }
            Reading::Watts | Reading::HeartRate => {
                let value = parse_reading(reading, text)?;
                if let Some(sample) = self.current.as_mut() {
                    if reading == Reading::Watts {
                        sample.watts = Some(value);
                    } else {
                        sample.heart_rate = Some(value);
                    }
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), TcxError> {
        // An element that opened a numeric reading but never carried text
        if let Some(reading) = self.pending.take() {
            if matches!(reading, Reading::Watts | Reading::HeartRate) {
                return Err(TcxError::InvalidReading { element: reading.element(), value: String::new() });
            }
        }

        if self.path.pop().as_deref() == Some("Trackpoint") {
            if let Some(sample) = self.current.take() {
                self.session.samples.push(sample);
            }
        }
        Ok(())
    }
}

fn parse_reading(reading: Reading, text: &str) -> Result<f64, TcxError> {
    text.trim().parse::<f64>().map_err(|_| TcxError::InvalidReading {
        element: reading.element(),
        value: text.to_string(),
    })
}

/// Parse TCX content into its session id and sample points
pub fn parse_tcx(content: &str) -> Result<TcxSession, TcxError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut builder = TcxBuilder::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                builder.open(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                builder.open(name);
                builder.close()?;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| TcxError::Xml(format!("Failed to unescape text: {}", e)))?;
                builder.text(&text)?;
            }
            Ok(Event::End(_)) => builder.close()?,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TcxError::Xml(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(builder.session)
}
