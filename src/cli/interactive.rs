//! Interactive colour test: one prompt per plate, then submission.

use std::io::{BufRead, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::Context;

use crate::application::ColourTestService;
use crate::domain::{uuid_v4, TestPlate, TestResult, TestSession};
use crate::ports::{PlateProvider, ResponseEvaluator};
use crate::OculusError;

/// Line-oriented question and answer over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn say(&mut self, message: &str) -> std::io::Result<()> {
        writeln!(self.output, "{message}")
    }

    /// Print `prompt` and read one trimmed line. `None` at end of input.
    fn ask(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Yes/no question defaulting to yes. End of input counts as no.
    fn confirm(&mut self, prompt: &str) -> std::io::Result<bool> {
        Ok(match self.ask(prompt)? {
            Some(answer) => !matches!(answer.to_ascii_lowercase().as_str(), "n" | "no"),
            None => false,
        })
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output
    }
}

/// Directory for one session's plates: `dir/<test id>`.
///
/// A test id that is not a single plain path component is replaced by a
/// fresh UUID.
fn session_dir(dir: &Path, test_id: &str) -> PathBuf {
    let mut components = Path::new(test_id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => dir.join(name),
        _ => {
            tracing::warn!("Unusable test id {:?} for a directory name", test_id);
            dir.join(uuid_v4())
        }
    }
}

/// Where a plate image is written: `dir/<file name>`, never outside `dir`.
fn plate_path(dir: &Path, plate: &TestPlate, index: usize) -> PathBuf {
    let name = Path::new(&plate.filename)
        .file_name()
        .map_or_else(|| format!("plate_{index:02}.png"), |n| n.to_string_lossy().into_owned());
    dir.join(name)
}

fn show_plate<P, E, R, W>(
    service: &ColourTestService<P, E>,
    session: &TestSession,
    index: usize,
    dir: &Path,
    prompter: &mut Prompter<R, W>,
) -> anyhow::Result<()>
where
    P: PlateProvider,
    E: ResponseEvaluator,
    R: BufRead,
    W: Write,
{
    let Some(plate) = session.plate(index) else {
        return Ok(());
    };
    let header = format!("Plate {}/{}", index + 1, session.len());

    match service.plate_image(session, index) {
        Ok(bytes) => {
            let path = plate_path(dir, plate, index);
            std::fs::write(&path, bytes)
                .with_context(|| format!("cannot save plate to {}", path.display()))?;
            prompter.say(&format!("{header}: open {}", path.display()))?;
        }
        Err(e) => {
            tracing::warn!("Could not fetch {}: {}", plate.filename, e);
            prompter.say(&format!("{header}: image unavailable ({e})"))?;
        }
    }
    Ok(())
}

/// Run a full colour test: provision, collect one digit per plate, submit.
///
/// Invalid answers are re-asked. If the evaluator is unreachable the user
/// is offered a retry with the same answers.
///
/// # Errors
/// Returns error if the session cannot start, input ends early, plate
/// images cannot be saved, or the user gives up after an evaluator failure.
pub fn run_colour_test<P, E, R, W>(
    service: &ColourTestService<P, E>,
    count: usize,
    plates_dir: &Path,
    prompter: &mut Prompter<R, W>,
) -> anyhow::Result<TestResult>
where
    P: PlateProvider,
    E: ResponseEvaluator,
    R: BufRead,
    W: Write,
{
    let session = service
        .start_session(count)
        .context("could not start the colour test")?;

    let dir = session_dir(plates_dir, session.test_id());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create plate directory {}", dir.display()))?;

    prompter.say(&format!(
        "Colour vision test: {} plates. Enter the number you see on each plate (0-9).",
        session.len()
    ))?;

    let mut sheet = session.new_sheet();
    for index in 0..session.len() {
        show_plate(service, &session, index, &dir, prompter)?;

        loop {
            let Some(answer) = prompter.ask("Number: ")? else {
                anyhow::bail!(
                    "input ended after {} of {} plates",
                    sheet.len(),
                    session.len()
                );
            };

            let Ok(digit) = answer.parse::<i64>() else {
                prompter.say("Please enter a single digit between 0 and 9.")?;
                continue;
            };

            match service.record_response(&session, &mut sheet, index, digit) {
                Ok(()) => break,
                Err(e @ OculusError::InvalidDigit(_)) => prompter.say(&format!("{e}."))?,
                Err(e) => return Err(e.into()),
            }
        }
    }

    loop {
        match service.submit(&session, &sheet) {
            Ok(result) => return Ok(result),
            Err(e @ OculusError::UpstreamUnavailable(_)) => {
                prompter.say(&format!("Evaluation failed: {e}"))?;
                if !prompter.confirm("Retry? [Y/n] ")? {
                    return Err(e).context("evaluation abandoned; answers were not scored");
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}
