use std::{fs::File, path::PathBuf};

use serde_json::Value;
use tracing::warn;
use workflow::JobDescription;

use crate::error::InputError;

/// Extensions whose files are parsed as a job description instead of being
/// passed along as molecule data.
const STRUCTURED_EXTENSIONS: [&str; 4] = ["js", "json", "yml", "yaml"];

/// Figures out whether `inputfile` is raw JSON, a JSON/YAML description, or
/// a data file to pass along verbatim.
pub fn process_input_file(inputfile: &str) -> Result<JobDescription, InputError> {
    if let Some(raw) = inline_json(inputfile) {
        match serde_json::from_str::<JobDescription>(raw) {
            Ok(job) => return Ok(job),
            Err(err) => warn!(
                "input looks like inline JSON but does not parse ({}), trying it as a file path",
                err
            ),
        }
    }

    let path = PathBuf::from(inputfile);
    let extension = inputfile.rsplit('.').next().unwrap_or_default();
    if STRUCTURED_EXTENSIONS.contains(&extension) {
        let file = File::open(&path).map_err(|err| InputError::Unreadable(path.clone(), err))?;
        let parsed: Value = serde_yaml::from_reader(file)
            .map_err(|err| InputError::Unparsable(path.clone(), err))?;
        match parsed {
            Value::Object(fields) => Ok(JobDescription::new(fields)),
            _ => Err(InputError::NotMapping(path)),
        }
    } else {
        let content =
            std::fs::read_to_string(&path).map_err(|err| InputError::Unreadable(path, err))?;
        Ok(JobDescription::from_file_content(inputfile, content))
    }
}

/// Strips matching quotes around `s` and returns it if it is shaped like a
/// JSON object.
fn inline_json(s: &str) -> Option<&str> {
    let mut s = s.trim();
    while s.len() >= 2 && (s.starts_with('"') || s.starts_with('\'')) && s.ends_with(&s[..1]) {
        s = s[1..s.len() - 1].trim();
    }
    (s.starts_with('{') && s.ends_with('}')).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn quotes_are_stripped_repeatedly() {
        assert_eq!(inline_json(r#" '"{"smiles": "C"}"' "#), Some(r#"{"smiles": "C"}"#));
        assert_eq!(inline_json("benzene.xyz"), None);
        assert_eq!(inline_json("'"), None);
    }

    #[test]
    fn inline_json_round_trips() {
        for raw in [
            r#"{"smiles": "CCO"}"#,
            r#"{"iupac": "ethanol"}"#,
            r#"{"inchi": "InChI=1S/C2H6O/c1-2-3/h3H,2H2,1H3"}"#,
            r#"{"pdb": "3aid"}"#,
            r#"{"filename": "a.xyz", "content": "1\n\nH 0 0 0"}"#,
        ] {
            let job: JobDescription = serde_json::from_str(raw).unwrap();
            let token = serde_json::to_string(&job).unwrap();
            assert_eq!(process_input_file(&token).unwrap(), job);
        }
    }

    #[test]
    fn yaml_file_is_parsed() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("job.yml");
        std::fs::write(&path, "smiles: CCO\n").unwrap();
        let job = process_input_file(path.to_str().unwrap()).unwrap();
        assert_eq!(job.get("smiles"), Some(&Value::String("CCO".to_string())));
    }

    #[test]
    fn data_file_is_passed_verbatim() {
        let mut file = tempfile::Builder::new().suffix(".xyz").tempfile().unwrap();
        write!(file, "1\nhydrogen\nH 0 0 0\n").unwrap();
        let name = file.path().to_str().unwrap().to_string();
        let job = process_input_file(&name).unwrap();
        assert_eq!(job.get("filename"), Some(&Value::String(name)));
        assert_eq!(
            job.get("content"),
            Some(&Value::String("1\nhydrogen\nH 0 0 0\n".to_string()))
        );
    }

    #[test]
    fn malformed_inline_json_falls_back_to_path() {
        assert!(matches!(
            process_input_file("{smiles: CCO"),
            Err(InputError::Unreadable(..))
        ));
        assert!(matches!(
            process_input_file("{\"smiles\": }"),
            Err(InputError::Unreadable(..))
        ));
    }
}
