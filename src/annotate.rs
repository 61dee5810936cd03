//! Linguistic annotation of passage text
//!
//! Tagging and dependency parsing are left to an external model. An
//! [`Annotator`] maps one passage's text to one [`ParsedPassage`].

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

use crate::conllu::parse_document;
use crate::error::{Error, Result};
use crate::tree::ParsedPassage;

pub trait Annotator {
    /// Name of the model, recorded in the parse cache
    fn model(&self) -> &str;

    fn annotate(&mut self, text: &str) -> Result<ParsedPassage>;
}

/// Runs a parser command per passage: text on stdin, CoNLL-U on stdout
///
/// Any tool with that contract works, e.g.
/// `udpipe --tokenize --tag --parse ancient_greek-proiel.udpipe` or a small
/// wrapper script around a spaCy pipeline.
#[derive(Debug, Clone)]
pub struct CommandAnnotator {
    program: String,
    args: Vec<String>,
    model: String,
}

impl CommandAnnotator {
    pub fn new(program: impl Into<String>, args: Vec<String>, model: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            model: model.into(),
        }
    }

    /// Build from a command line (program first); an empty command is
    /// accepted and fails on first use
    pub fn from_command(command: &[String], model: impl Into<String>) -> Self {
        match command.split_first() {
            Some((program, args)) => Self::new(program.clone(), args.to_vec(), model),
            None => Self::new(String::new(), Vec::new(), model),
        }
    }
}

impl Annotator for CommandAnnotator {
    fn model(&self) -> &str {
        &self.model
    }

    fn annotate(&mut self, text: &str) -> Result<ParsedPassage> {
        if text.trim().is_empty() {
            return Ok(ParsedPassage::default());
        }
        if self.program.is_empty() {
            return Err(Error::annotator("no parser command configured"));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::annotator(format!("cannot start {}: {}", self.program, e)))?;

        // Stdin is fed from its own thread while stdout drains
        let stdin = child.stdin.take();
        let (written, output) = thread::scope(|s| {
            let writer = s.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(text.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output.map_err(|e| Error::annotator(format!("waiting for {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(Error::annotator(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        match written {
            Ok(Ok(())) => {}
            // The parser finished without reading all of its input
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(Error::annotator(format!("writing to {}: {}", self.program, e))),
            Err(_) => return Err(Error::annotator(format!("stdin writer for {} panicked", self.program))),
        }

        let conllu = String::from_utf8(output.stdout)
            .map_err(|e| Error::annotator(format!("{} wrote invalid UTF-8: {}", self.program, e)))?;
        let sentences = parse_document(&conllu)?;
        debug!(sentences = sentences.len(), "annotated passage");

        Ok(ParsedPassage::new(sentences))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> CommandAnnotator {
        CommandAnnotator::new("sh", vec!["-c".to_string(), script.to_string()], "test-model")
    }

    #[test]
    fn test_reads_conllu_from_stdout() {
        let mut annotator = shell(
            "cat >/dev/null; printf '1\\tεἴη\\tεἰμί\\tVERB\\t_\\tMood=Opt\\t0\\troot\\t_\\t_\\n2\\tἄν\\tἄν\\tADV\\t_\\t_\\t1\\tadvmod\\t_\\t_\\n'",
        );
        assert_eq!(annotator.model(), "test-model");

        let parsed = annotator.annotate("εἴη ἄν").unwrap();
        assert_eq!(parsed.sentences.len(), 1);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.sentences[0].nodes[0].feats.get("Mood"), Some("Opt"));
    }

    #[test]
    fn test_passes_text_on_stdin() {
        // Echo the input back as a single-token sentence
        let mut annotator = shell("read w; printf '1\\t%s\\t%s\\tX\\t_\\t_\\t0\\troot\\t_\\t_\\n' \"$w\" \"$w\"");
        let parsed = annotator.annotate("λόγος\n").unwrap();
        assert_eq!(parsed.sentences[0].nodes[0].form, "λόγος");
    }

    #[test]
    fn test_large_passage_streams_output() {
        // One sentence per input line, written as soon as the line is read
        let mut annotator =
            shell("awk '{ printf \"1\\t%s\\t%s\\tX\\t_\\t_\\t0\\troot\\t_\\t_\\n\\n\", $0, $0 }'");
        let text = "λόγος\n".repeat(40_000);
        let parsed = annotator.annotate(&text).unwrap();
        assert_eq!(parsed.sentences.len(), 40_000);
        assert_eq!(parsed.sentences[39_999].nodes[0].form, "λόγος");
    }

    #[test]
    fn test_empty_text_skips_parser() {
        let mut annotator = shell("exit 1");
        assert!(annotator.annotate("   ").unwrap().is_empty());
    }

    #[test]
    fn test_failing_command() {
        let mut annotator = shell("cat >/dev/null; echo boom >&2; exit 3");
        let err = annotator.annotate("λόγος").unwrap_err();
        assert!(err.is_collaborator_error());
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_malformed_output() {
        let mut annotator = shell("cat >/dev/null; echo 'not conllu'");
        let err = annotator.annotate("λόγος").unwrap_err();
        assert!(matches!(err, Error::Conllu(_)));
    }

    #[test]
    fn test_from_command() {
        let command = vec!["sh".to_string(), "-c".to_string(), "cat >/dev/null".to_string()];
        let mut annotator = CommandAnnotator::from_command(&command, "m");
        assert!(annotator.annotate("λόγος").unwrap().is_empty());

        let mut unconfigured = CommandAnnotator::from_command(&[], "m");
        let err = unconfigured.annotate("λόγος").unwrap_err();
        assert!(err.to_string().contains("no parser command"));
    }

    #[test]
    fn test_missing_program() {
        let mut annotator = CommandAnnotator::new("/nonexistent/parser", vec![], "m");
        assert!(annotator.annotate("λόγος").is_err());
    }
}
