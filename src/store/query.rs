//! Query View
//!
//! Filtered, search-matched view over the todo collection. Never mutates.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{DomainError, Todo};

/// Completion-status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn accepts(&self, todo: &Todo) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => todo.completed,
            StatusFilter::Pending => !todo.completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "pending" | "open" => Ok(StatusFilter::Pending),
            other => Err(DomainError::InvalidInput(format!("unknown status filter '{}'", other))),
        }
    }
}

/// Lazy iterator over the todos matching a search needle and a status filter.
///
/// Cloning restarts the traversal from the same position.
#[derive(Debug, Clone)]
pub struct TodoQuery<'a> {
    todos: std::slice::Iter<'a, Todo>,
    needle: String,
    filter: StatusFilter,
}

impl<'a> TodoQuery<'a> {
    pub(crate) fn new(todos: &'a [Todo], search: &str, filter: StatusFilter) -> Self {
        Self {
            todos: todos.iter(),
            needle: search.to_lowercase(),
            filter,
        }
    }
}

impl<'a> Iterator for TodoQuery<'a> {
    type Item = &'a Todo;

    fn next(&mut self) -> Option<Self::Item> {
        let needle = &self.needle;
        let filter = self.filter;
        self.todos
            .find(|todo| filter.accepts(todo) && todo.matches_lowercase(needle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.todos.size_hint().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
    use chrono::Utc;

    fn todos() -> Vec<Todo> {
        let mut list = vec![
            Todo::new("1", "Buy food", Priority::None, Utc::now()),
            Todo::new("2", "Walk dog", Priority::High, Utc::now()),
            Todo::new("3", "FOOlish plan", Priority::Low, Utc::now()),
        ];
        list[2].completed = true;
        list
    }

    fn ids(query: TodoQuery<'_>) -> Vec<&str> {
        query.map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_search_is_case_insensitive_and_ordered() {
        let list = todos();
        assert_eq!(ids(TodoQuery::new(&list, "foo", StatusFilter::All)), vec!["1", "3"]);
    }

    #[test]
    fn test_padded_search_keeps_spaces() {
        let mut list = todos();
        list.push(Todo::new("4", "dogma", Priority::None, Utc::now()));
        assert_eq!(ids(TodoQuery::new(&list, " dog", StatusFilter::All)), vec!["2"]);
        assert_eq!(ids(TodoQuery::new(&list, "dog ", StatusFilter::All)), Vec::<&str>::new());
        assert_eq!(ids(TodoQuery::new(&list, " ", StatusFilter::All)), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_status_filters() {
        let list = todos();
        assert_eq!(ids(TodoQuery::new(&list, "", StatusFilter::Completed)), vec!["3"]);
        assert_eq!(ids(TodoQuery::new(&list, "", StatusFilter::Pending)), vec!["1", "2"]);
        assert_eq!(ids(TodoQuery::new(&list, "foo", StatusFilter::Pending)), vec!["1"]);
    }

    #[test]
    fn test_query_is_restartable() {
        let list = todos();
        let query = TodoQuery::new(&list, "o", StatusFilter::All);
        let first: Vec<_> = query.clone().collect();
        let second: Vec<_> = query.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("Done".parse::<StatusFilter>().unwrap(), StatusFilter::Completed);
        assert!("someday".parse::<StatusFilter>().is_err());
    }
}
