use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

const DONE_PREFIX: &str = "[x] ";

/// One todo entry as served to the dashboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    /// Position-derived identifier, assigned on read.
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

/// Newline-delimited flat-file todo store. A `[x] ` prefix marks an item as
/// done, so the file stays human-editable. A missing file reads as an empty
/// list; the data directory is created on first write.
pub struct TodoStore {
    path: PathBuf,
}

impl TodoStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        TodoStore {
            path: data_dir.into().join("todos.txt"),
        }
    }

    pub fn read(&self) -> io::Result<Vec<Todo>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(index, line)| {
                let (done, text) = match line.strip_prefix(DONE_PREFIX) {
                    Some(rest) => (true, rest),
                    None => (false, line),
                };
                Todo {
                    id: format!("t{}", index + 1),
                    text: text.to_string(),
                    done,
                }
            })
            .collect())
    }

    /// Replaces the whole list. Embedded newlines are flattened to spaces
    /// and empty entries are dropped, keeping the file one item per line.
    pub fn write(&self, todos: &[Todo]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut contents = String::new();
        for todo in todos {
            let text = todo.text.replace('\n', " ");
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            if todo.done {
                contents.push_str(DONE_PREFIX);
            }
            contents.push_str(text);
            contents.push('\n');
        }
        fs::write(&self.path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(text: &str, done: bool) -> Todo {
        Todo {
            id: String::new(),
            text: text.to_string(),
            done,
        }
    }

    #[test]
    fn a_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoStore::new(dir.path());
        assert!(store.read().unwrap().is_empty());
    }

    #[test]
    fn entries_round_trip_with_fresh_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoStore::new(dir.path());

        store
            .write(&[todo("review MR !11", false), todo("ship deploy notes", true)])
            .unwrap();

        let read_back = store.read().unwrap();
        assert_eq!(
            read_back,
            vec![
                Todo {
                    id: "t1".to_string(),
                    text: "review MR !11".to_string(),
                    done: false,
                },
                Todo {
                    id: "t2".to_string(),
                    text: "ship deploy notes".to_string(),
                    done: true,
                },
            ]
        );
    }

    #[test]
    fn writes_sanitize_newlines_and_drop_empty_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoStore::new(dir.path());

        store
            .write(&[todo("two\nlines", false), todo("   ", false), todo("", true)])
            .unwrap();

        let read_back = store.read().unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].text, "two lines");
    }

    #[test]
    fn a_rewrite_replaces_the_whole_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoStore::new(dir.path());

        store.write(&[todo("old", false)]).unwrap();
        store.write(&[todo("new", true)]).unwrap();

        let read_back = store.read().unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].text, "new");
        assert!(read_back[0].done);
    }
}
