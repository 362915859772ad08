use db::models::task::Task;
use services::services::board::Board;

use crate::{api::ApiClient, error::ClientError};

impl ApiClient {
    /// Turns a card drop on a loaded board into at most one status update.
    ///
    /// Returns `None` when the card was dropped onto its own column.
    pub async fn drop_card(
        &self,
        board: &Board,
        task_id: i64,
        column: &str,
    ) -> Result<Option<Task>, ClientError> {
        match board.drop_task(task_id, column)? {
            Some(update) => {
                tracing::debug!(task_id, column, "Moving card");
                self.set_task_status(update.task_id, &update.status)
                    .await
                    .map(Some)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use db::models::{task::Task, task_type::TaskType, team::TeamBrief};
    use serde_json::json;
    use services::services::board::{Board, BoardError};

    use crate::{
        api::{
            ApiClient,
            test_server::{PASSWORD, spawn, task_json, task_type_json},
        },
        error::ClientError,
    };

    fn board() -> Board {
        let task_type: TaskType =
            serde_json::from_value(task_type_json(1, &["Backlog", "Doing", "Done"])).unwrap();
        let task: Task = serde_json::from_value(task_json(42, "Backlog")).unwrap();
        let team = TeamBrief {
            id: 1,
            name: "Platform".to_string(),
            slug: "platform".to_string(),
        };
        Board::build(team, &[task_type], vec![task])
    }

    #[tokio::test]
    async fn drop_sends_only_the_new_status() {
        let server = spawn().await;
        let client = ApiClient::new(&server.base_url);
        client.login("admin@corepm.local", PASSWORD).await.unwrap();
        let board = board();

        let moved = client.drop_card(&board, 42, "Done").await.unwrap().unwrap();
        assert_eq!(moved.status, "Done");
        assert_eq!(
            server.recorder.bodies("update_task"),
            vec![json!({
                "title": null,
                "team_id": null,
                "task_type_id": null,
                "status": "Done",
                "custom_data": null
            })]
        );

        assert!(client.drop_card(&board, 42, "Backlog").await.unwrap().is_none());
        assert!(matches!(
            client.drop_card(&board, 42, "Shipped").await,
            Err(ClientError::Board(BoardError::UnknownColumn { .. }))
        ));
        assert_eq!(server.recorder.hits("update_task"), 1);
    }
}
