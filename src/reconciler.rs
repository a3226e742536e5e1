use crate::models::{ChangeEvent, Task};

/// The locally held view of the `tasks` table: at most one entry per id,
/// ordered by `created_at` descending to match the server query.
///
/// Two sources feed it and may race: full refreshes after local mutations,
/// and realtime change notifications. `apply` is idempotent so the list
/// converges to the same state regardless of which arrives first.
#[derive(Debug, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> TaskList {
        TaskList { tasks: Vec::new() }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    /// Full-refresh reconciliation: the fetched set replaces local state
    /// wholesale, in the server's order. Never a merge.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn apply(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Insert { new } => {
                // A racing refresh may already have fetched this row.
                if self.position(new.id).is_none() {
                    self.tasks.push(new);
                    self.tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                }
            }
            ChangeEvent::Update { new } => {
                // Absence is not an error: a refresh already converged
                // this row past the update.
                if let Some(index) = self.position(new.id) {
                    self.tasks[index] = new;
                }
            }
            ChangeEvent::Delete { id } => {
                if let Some(index) = self.position(id) {
                    self.tasks.remove(index);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn task(id: i64, minute: u32) -> Task {
        Task {
            id,
            title: format!("task {}", id),
            description: "desc".to_string(),
            image_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
            email: Some("a@b.com".to_string()),
        }
    }

    fn ids(list: &TaskList) -> Vec<i64> {
        list.tasks().iter().map(|task| task.id).collect()
    }

    #[test]
    fn test_insert_is_ignored_when_id_already_present() {
        let mut list = TaskList::new();
        list.replace_all(vec![task(3, 10)]);
        list.apply(ChangeEvent::Insert { new: task(3, 10) });
        assert_eq!(ids(&list), vec![3]);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut list = TaskList::new();
        list.replace_all(vec![task(1, 0)]);
        list.apply(ChangeEvent::Insert { new: task(2, 5) });
        let once = ids(&list);
        list.apply(ChangeEvent::Insert { new: task(2, 5) });
        assert_eq!(ids(&list), once);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_insert_keeps_created_at_descending_order() {
        let mut list = TaskList::new();
        list.replace_all(vec![task(5, 30), task(1, 10)]);
        // A row created by another session, between the two we hold.
        list.apply(ChangeEvent::Insert { new: task(3, 20) });
        assert_eq!(ids(&list), vec![5, 3, 1]);
    }

    #[test]
    fn test_update_replaces_matching_entry() {
        let mut list = TaskList::new();
        list.replace_all(vec![task(2, 20), task(1, 10)]);
        let mut edited = task(1, 10);
        edited.title = "renamed".to_string();
        list.apply(ChangeEvent::Update { new: edited });
        assert_eq!(list.tasks()[1].title, "renamed");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_update_without_match_is_a_no_op() {
        let mut list = TaskList::new();
        list.replace_all(vec![task(1, 10)]);
        list.apply(ChangeEvent::Update { new: task(9, 40) });
        assert_eq!(ids(&list), vec![1]);
    }

    #[test]
    fn test_delete_removes_matching_entry() {
        let mut list = TaskList::new();
        list.replace_all(vec![task(2, 20), task(1, 10)]);
        list.apply(ChangeEvent::Delete { id: 2 });
        assert_eq!(ids(&list), vec![1]);
    }

    #[test]
    fn test_delete_without_match_is_a_no_op() {
        let mut list = TaskList::new();
        list.replace_all(vec![task(1, 10)]);
        list.apply(ChangeEvent::Delete { id: 9 });
        list.apply(ChangeEvent::Delete { id: 9 });
        assert_eq!(ids(&list), vec![1]);
    }

    #[test]
    fn test_replace_all_takes_the_server_response_verbatim() {
        let mut list = TaskList::new();
        list.replace_all(vec![task(1, 10)]);
        // After a successful create, the refresh returns the new row first.
        let refreshed = vec![task(2, 20), task(1, 10)];
        list.replace_all(refreshed.clone());
        assert_eq!(list.tasks(), refreshed.as_slice());
    }

    #[test]
    fn test_no_duplicates_across_interleaved_events() {
        let mut list = TaskList::new();
        list.apply(ChangeEvent::Insert { new: task(1, 10) });
        list.replace_all(vec![task(2, 20), task(1, 10)]);
        list.apply(ChangeEvent::Insert { new: task(2, 20) });
        list.apply(ChangeEvent::Update { new: task(2, 20) });
        list.apply(ChangeEvent::Insert { new: task(1, 10) });
        assert_eq!(ids(&list), vec![2, 1]);
    }

    #[test]
    fn test_refresh_then_insert_and_insert_then_refresh_converge() {
        let server = vec![task(2, 20), task(1, 10)];

        let mut refresh_first = TaskList::new();
        refresh_first.replace_all(server.clone());
        refresh_first.apply(ChangeEvent::Insert { new: task(2, 20) });

        let mut insert_first = TaskList::new();
        insert_first.replace_all(vec![task(1, 10)]);
        insert_first.apply(ChangeEvent::Insert { new: task(2, 20) });
        insert_first.replace_all(server);

        assert_eq!(refresh_first.tasks(), insert_first.tasks());
    }
}
