//! Dispatch Module Tests
//!
//! Runs real worker event loops against a controller inside one process.
//!
//! ## Test Scopes
//! - **Protocol**: the command table and the `info` listing.
//! - **Sessions**: full command sequences driven through `MatrixClient`, checked
//!   against the values the controller reads back and the workers' registries.
//! - **Termination**: every out-of-range code ends the session cleanly.
//! - **Failures**: invalid handles, desynchronized peers and unmatched collectives
//!   end the worker's session with a typed error.
//! - **TCP**: one session over real sockets through `run_eventloop`.

#[cfg(test)]
mod tests {
    use crate::config::WorkerConfig;
    use crate::controller::client::MatrixClient;
    use crate::controller::partitioner::Partition;
    use crate::controller::root::Controller;
    use crate::dispatch::protocol::{Command, SHUTDOWN, info_lines};
    use crate::dispatch::worker::{Worker, WorkerState, run_eventloop};
    use crate::error::{Error, Result};
    use crate::linalg::local::LocalBackend;
    use crate::linalg::types::{BackendError, ConnectivityGraph, DistributedMatrix};
    use crate::registry::types::ObjectKind;
    use crate::transport::endpoint::{Collective, Endpoint};
    use crate::transport::harness::local_group;
    use crate::transport::types::Op;
    use crate::types::{Code, Global, Handle, Size};

    use std::time::Duration;
    use tokio::io::DuplexStream;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    type TestWorker = Worker<Endpoint<DuplexStream>, LocalBackend>;
    type Finished = (TestWorker, Result<()>);

    const PATIENT: Duration = Duration::from_secs(5);
    const IMPATIENT: Duration = Duration::from_millis(200);

    fn spawn_workers(endpoints: Vec<Endpoint<DuplexStream>>) -> Vec<JoinHandle<Finished>> {
        endpoints
            .into_iter()
            .map(|endpoint| {
                tokio::spawn(async move {
                    let mut worker = Worker::new(endpoint, LocalBackend);
                    let result = worker.run().await;
                    (worker, result)
                })
            })
            .collect()
    }

    async fn start_session(
        group_size: usize,
        timeout: Duration,
    ) -> (MatrixClient<DuplexStream>, Vec<JoinHandle<Finished>>) {
        let (controller, endpoints) = local_group(group_size, Some(timeout)).await.unwrap();
        (MatrixClient::new(controller), spawn_workers(endpoints))
    }

    async fn join(handles: Vec<JoinHandle<Finished>>) -> Vec<Finished> {
        let mut finished = Vec::with_capacity(handles.len());
        for handle in handles {
            finished.push(handle.await.unwrap());
        }
        finished
    }

    // ============================================================
    // PROTOCOL TESTS
    // ============================================================

    #[test]
    fn test_command_codes_follow_table_order() {
        for (position, command) in Command::ALL.iter().enumerate() {
            assert_eq!(command.code() as usize, position);
            assert_eq!(Command::from_code(command.code()), Some(*command));
        }

        assert_eq!(Command::from_code(0), Some(Command::CreateMatrix));
        assert_eq!(Command::from_code(5), Some(Command::CreateGraph));
        assert_eq!(Command::from_code(6), None);
        assert_eq!(Command::from_code(SHUTDOWN), None);
    }

    #[test]
    fn test_info_lines() {
        assert_eq!(
            info_lines(),
            vec![
                "token: enum(create_matrix, create_vector, accumulate_vector, read_vector, create_map, create_graph)",
                "local: int32",
                "global: int64",
                "size: int32",
                "handle: int32",
                "scalar: float64",
            ]
        );
    }

    // ============================================================
    // SESSION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_accumulate_and_read_back() {
        let (mut client, workers) = start_session(2, PATIENT).await;
        let partition = Partition::contiguous(4, 2).unwrap();

        let map = client.create_map(&partition).await.unwrap();
        let vector = client.create_vector(map).await.unwrap();
        assert_eq!((map, vector), (0, 0));

        client.accumulate_vector(0, vector, &[0], &[5.0]).await.unwrap();
        client.accumulate_vector(1, vector, &[2], &[7.0]).await.unwrap();

        let values = client.read_vector(vector).await.unwrap();
        assert_eq!(values, vec![vec![5.0, 0.0], vec![7.0, 0.0]]);
        assert_eq!(
            partition.assemble(&values).unwrap(),
            vec![5.0, 0.0, 7.0, 0.0]
        );

        // accumulation adds, it does not overwrite
        client
            .accumulate_vector(1, vector, &[2, 3, 2], &[1.0, 0.5, 1.0])
            .await
            .unwrap();
        let values = client.read_vector(vector).await.unwrap();
        assert_eq!(values, vec![vec![5.0, 0.0], vec![9.0, 0.5]]);

        client.shutdown().await.unwrap();

        for (worker, result) in join(workers).await {
            result.unwrap();
            assert_eq!(worker.state(), WorkerState::Terminated);
            assert_eq!(worker.commands_handled(), 7);
            assert_eq!(worker.registry().len(ObjectKind::Map), 1);
            assert_eq!(worker.registry().len(ObjectKind::Vector), 1);
        }
    }

    #[tokio::test]
    async fn test_accumulate_touches_only_the_target() {
        let (mut client, workers) = start_session(3, PATIENT).await;
        let partition = Partition::contiguous(6, 3).unwrap();

        let map = client.create_map(&partition).await.unwrap();
        let vector = client.create_vector(map).await.unwrap();

        // ranks 0 and 2 move straight on to the next command
        client.accumulate_vector(1, vector, &[3], &[2.0]).await.unwrap();
        let values = client.read_vector(vector).await.unwrap();

        assert_eq!(
            values,
            vec![vec![0.0, 0.0], vec![0.0, 2.0], vec![0.0, 0.0]]
        );

        client.shutdown().await.unwrap();
        for (_, result) in join(workers).await {
            result.unwrap();
        }
    }

    #[tokio::test]
    async fn test_handles_are_dense_per_table() {
        let (mut client, workers) = start_session(2, PATIENT).await;
        let partition = Partition::contiguous(5, 2).unwrap();

        let map = client.create_map(&partition).await.unwrap();

        let mut vectors = Vec::new();
        for _ in 0..4 {
            vectors.push(client.create_vector(map).await.unwrap());
        }
        assert_eq!(vectors, vec![0, 1, 2, 3]);

        // maps and vectors count independently
        assert_eq!(client.create_map(&partition).await.unwrap(), 1);
        assert_eq!(client.create_vector(1).await.unwrap(), 4);

        client.shutdown().await.unwrap();

        for (worker, result) in join(workers).await {
            result.unwrap();
            assert_eq!(worker.registry().len(ObjectKind::Map), 2);
            assert_eq!(worker.registry().len(ObjectKind::Vector), 5);
            assert_eq!(worker.registry().total(), 7);
        }
    }

    #[tokio::test]
    async fn test_graph_and_matrix_follow_the_map() {
        let (mut client, workers) = start_session(2, PATIENT).await;
        let partition = Partition::contiguous(4, 2).unwrap();

        let map = client.create_map(&partition).await.unwrap();

        let rows: Vec<Vec<Vec<Global>>> = vec![
            vec![vec![0, 1], vec![2, 0, 1]],
            vec![vec![1, 2, 3], vec![3]],
        ];
        let graph = client.create_graph(map, &rows).await.unwrap();
        let matrix = client.create_matrix(graph).await.unwrap();
        assert_eq!((graph, matrix), (0, 0));

        client.shutdown().await.unwrap();

        let finished = join(workers).await;
        let expected_entries = [5, 4];

        for (rank, (worker, result)) in finished.iter().enumerate() {
            assert!(result.is_ok(), "worker {} failed: {:?}", rank, result);

            let graph = worker.registry().graphs.resolve(graph).unwrap();
            assert!(graph.is_sealed());
            assert_eq!(graph.local_rows(), 2);
            assert_eq!(graph.num_entries(), expected_entries[rank]);

            let matrix = worker.registry().matrices.resolve(matrix).unwrap();
            assert_eq!(matrix.num_entries(), expected_entries[rank]);
        }

        let (worker, _) = &finished[0];
        let graph = worker.registry().graphs.resolve(0).unwrap();
        assert_eq!(graph.row(1).unwrap(), &[0, 1, 2]);

        let matrix = worker.registry().matrices.resolve(0).unwrap();
        let (columns, values) = matrix.row(1).unwrap();
        assert_eq!(columns, &[0, 1, 2]);
        assert_eq!(values, &[0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_uneven_partition_with_empty_worker() {
        let (mut client, workers) = start_session(3, PATIENT).await;
        let partition = Partition::new(3, vec![vec![2, 0], vec![], vec![1]]).unwrap();

        let map = client.create_map(&partition).await.unwrap();
        let vector = client.create_vector(map).await.unwrap();
        client
            .accumulate_vector(0, vector, &[2, 0], &[4.0, 1.0])
            .await
            .unwrap();

        let values = client.read_vector(vector).await.unwrap();
        assert_eq!(values, vec![vec![4.0, 1.0], vec![], vec![0.0]]);
        assert_eq!(partition.assemble(&values).unwrap(), vec![1.0, 0.0, 4.0]);

        let rows = vec![vec![vec![0], vec![2]], vec![], vec![vec![0, 1, 2]]];
        assert_eq!(client.create_graph(map, &rows).await.unwrap(), 0);

        client.shutdown().await.unwrap();
        for (_, result) in join(workers).await {
            result.unwrap();
        }
    }

    // ============================================================
    // TERMINATION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_any_code_past_the_table_ends_the_session() {
        for code in [6 as Code, 42, SHUTDOWN] {
            let (mut controller, endpoints) = local_group(2, Some(PATIENT)).await.unwrap();
            let workers = spawn_workers(endpoints);

            controller.broadcast(&[code]).await.unwrap();
            controller.disconnect().await.unwrap();

            for (worker, result) in join(workers).await {
                result.unwrap();
                assert_eq!(worker.state(), WorkerState::Terminated);
                assert_eq!(worker.commands_handled(), 0);
                assert_eq!(worker.registry().total(), 0);
            }
        }
    }

    #[tokio::test]
    async fn test_new_worker_is_idle() {
        let (_root, stream) = tokio::io::duplex(64);
        let endpoint = Endpoint::connect(stream, 0, 1, None).await.unwrap();
        let worker = Worker::new(endpoint, LocalBackend);

        assert_eq!(worker.state(), WorkerState::Idle);
        assert_eq!(worker.commands_handled(), 0);
    }

    // ============================================================
    // FAILURE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_unknown_handle_ends_the_session() {
        let (mut client, workers) = start_session(2, IMPATIENT).await;

        // no map exists yet; the workers stop before gathering
        let result = client.create_vector(3).await;
        assert!(matches!(result, Err(Error::Timeout { op: Op::Gather, .. })));

        for (worker, result) in join(workers).await {
            assert!(matches!(
                result,
                Err(Error::InvalidHandle {
                    kind: ObjectKind::Map,
                    handle: 3,
                    len: 0
                })
            ));
            assert_eq!(
                worker.state(),
                WorkerState::Dispatching(Command::CreateVector)
            );
        }
    }

    #[tokio::test]
    async fn test_accumulate_outside_owned_range_fails() {
        let (mut client, workers) = start_session(2, IMPATIENT).await;
        let partition = Partition::contiguous(4, 2).unwrap();

        let map = client.create_map(&partition).await.unwrap();
        let vector = client.create_vector(map).await.unwrap();

        // index 3 belongs to rank 1
        client.accumulate_vector(0, vector, &[3], &[1.0]).await.unwrap();
        assert!(client.read_vector(vector).await.is_err());

        let finished = join(workers).await;
        assert!(matches!(
            finished[0].1,
            Err(Error::Backend(BackendError::NotOwned(3)))
        ));
    }

    #[tokio::test]
    async fn test_wrong_datatype_is_a_desync() {
        let (mut controller, endpoints) = local_group(1, Some(IMPATIENT)).await.unwrap();
        let workers = spawn_workers(endpoints);

        controller
            .broadcast(&[Command::CreateMap.code()])
            .await
            .unwrap();
        // the global size travels as a size, not a global
        controller.broadcast::<Global>(&[4]).await.unwrap();

        let (worker, result) = join(workers).await.remove(0);
        assert!(matches!(result, Err(Error::ProtocolDesync(_))));
        assert_eq!(worker.registry().total(), 0);
    }

    #[tokio::test]
    async fn test_negative_global_size_is_a_desync() {
        let (mut controller, endpoints) = local_group(1, Some(IMPATIENT)).await.unwrap();
        let workers = spawn_workers(endpoints);

        controller
            .broadcast(&[Command::CreateMap.code()])
            .await
            .unwrap();
        controller.broadcast::<Size>(&[-3]).await.unwrap();
        controller.scatter::<Size>(&[0]).await.unwrap();
        controller.scatterv::<Global>(&[vec![]]).await.unwrap();

        let (worker, result) = join(workers).await.remove(0);
        assert!(matches!(result, Err(Error::ProtocolDesync(_))));
        assert_eq!(worker.registry().total(), 0);
    }

    #[tokio::test]
    async fn test_column_counts_must_match_owned_rows() {
        let (mut client, workers) = start_session(1, IMPATIENT).await;
        let partition = Partition::contiguous(2, 1).unwrap();

        let map = client.create_map(&partition).await.unwrap();

        // the worker owns two rows but only one column count arrives
        let controller = client.controller();
        controller
            .broadcast(&[Command::CreateGraph.code()])
            .await
            .unwrap();
        controller.broadcast::<Handle>(&[map]).await.unwrap();
        controller.scatterv::<Size>(&[vec![1]]).await.unwrap();
        controller.scatterv::<Global>(&[vec![0]]).await.unwrap();

        let (worker, result) = join(workers).await.remove(0);
        assert!(matches!(result, Err(Error::ProtocolDesync(_))));
        assert_eq!(
            worker.state(),
            WorkerState::Dispatching(Command::CreateGraph)
        );
        assert_eq!(worker.registry().len(ObjectKind::Map), 1);
        assert_eq!(worker.registry().len(ObjectKind::Graph), 0);
    }

    #[tokio::test]
    async fn test_wrong_collective_is_a_desync() {
        let (mut controller, endpoints) = local_group(1, Some(IMPATIENT)).await.unwrap();
        let workers = spawn_workers(endpoints);

        // the command code is always broadcast
        controller.scatter::<Code>(&[Command::ReadVector.code()]).await.unwrap();

        let (worker, result) = join(workers).await.remove(0);
        assert!(matches!(result, Err(Error::ProtocolDesync(_))));
        assert_eq!(worker.state(), WorkerState::AwaitingCommand);
    }

    #[tokio::test]
    async fn test_unmatched_collective_times_out() {
        let (mut controller, endpoints) = local_group(2, Some(IMPATIENT)).await.unwrap();
        let workers = spawn_workers(endpoints);

        controller
            .broadcast(&[Command::CreateMap.code()])
            .await
            .unwrap();
        controller.broadcast::<Size>(&[4]).await.unwrap();
        // the scatter of owned counts never comes

        for (_, result) in join(workers).await {
            assert!(matches!(
                result,
                Err(Error::Timeout {
                    op: Op::Scatter,
                    ..
                })
            ));
        }
    }

    #[tokio::test]
    async fn test_client_detects_diverging_handles() {
        let (controller, endpoints) = local_group(2, Some(PATIENT)).await.unwrap();
        let mut client = MatrixClient::new(controller);

        let fake = tokio::spawn(async move {
            for mut endpoint in endpoints {
                let code: Code = endpoint.broadcast_one().await?;
                assert_eq!(code, Command::CreateVector.code());
                let _map: Handle = endpoint.broadcast_one().await?;
                let rank = endpoint.rank() as Handle;
                endpoint.gather_one(rank).await?;
            }
            Ok::<(), Error>(())
        });

        let result = client.create_vector(0).await;
        assert!(matches!(result, Err(Error::ProtocolDesync(_))));
        fake.await.unwrap().unwrap();
    }

    // ============================================================
    // TCP TESTS
    // ============================================================

    #[tokio::test]
    async fn test_session_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let workers: Vec<JoinHandle<Result<()>>> = (0..2)
            .map(|rank| {
                let config = WorkerConfig {
                    controller: addr,
                    rank,
                    group_size: 2,
                    recv_timeout: Some(PATIENT),
                };
                tokio::spawn(async move { run_eventloop(&config).await })
            })
            .collect();

        let controller = Controller::accept(&listener, 2)
            .await
            .unwrap()
            .with_timeout(PATIENT);
        let mut client = MatrixClient::new(controller);

        let partition = Partition::contiguous(3, 2).unwrap();
        let map = client.create_map(&partition).await.unwrap();
        let vector = client.create_vector(map).await.unwrap();
        client
            .accumulate_vector(0, vector, &[1, 1], &[0.25, 0.25])
            .await
            .unwrap();

        let values = client.read_vector(vector).await.unwrap();
        assert_eq!(
            partition.assemble(&values).unwrap(),
            vec![0.0, 0.5, 0.0]
        );

        client.shutdown().await.unwrap();
        for worker in workers {
            worker.await.unwrap().unwrap();
        }
    }
}
