use async_trait::async_trait;
use omni_config::SubmissionConfig;
use omni_delivery::create_sign_and_send;
use omni_types::{
	EndpointId, OmniBatchSigner, OmniPoint, OmniSigner, OmniTransaction, OmniTransactionWithError,
	OmniTransactionWithReceipt, SharedTransaction, SignerError, SignerFactory, TransactionHash,
	TransactionReceipt, TransactionResponse,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

fn transaction(eid: u32, address: &str) -> SharedTransaction {
	Arc::new(
		OmniTransaction::new(OmniPoint::new(EndpointId(eid), address), vec![0x01_u8])
			.with_description(format!("call {}", address)),
	)
}

fn receipt(hash: &str) -> TransactionReceipt {
	TransactionReceipt {
		transaction_hash: TransactionHash::from(hash),
		block_number: Some(1),
		success: true,
	}
}

/// Signer whose behaviour is keyed by the transaction's address.
#[derive(Default)]
struct MockSigner {
	eid: u32,
	fail_submission: HashSet<String>,
	fail_wait: HashSet<String>,
	submitted: Mutex<Vec<String>>,
	batch: Option<BatchBehaviour>,
}

#[derive(Clone, Copy, PartialEq)]
enum BatchBehaviour {
	Succeed,
	FailSubmission,
	FailWait,
}

impl MockSigner {
	fn new(eid: u32) -> Self {
		Self {
			eid,
			..Self::default()
		}
	}

	fn failing_submission(mut self, address: &str) -> Self {
		self.fail_submission.insert(address.to_string());
		self
	}

	fn failing_wait(mut self, address: &str) -> Self {
		self.fail_wait.insert(address.to_string());
		self
	}

	fn with_batch(mut self, behaviour: BatchBehaviour) -> Self {
		self.batch = Some(behaviour);
		self
	}
}

#[async_trait]
impl OmniSigner for MockSigner {
	fn point(&self) -> OmniPoint {
		OmniPoint::new(EndpointId(self.eid), "0xsigner")
	}

	async fn sign(&self, transaction: &OmniTransaction) -> Result<String, SignerError> {
		Ok(format!("signed {}", transaction.point.address))
	}

	async fn sign_and_send(
		&self,
		transaction: &OmniTransaction,
	) -> Result<TransactionResponse, SignerError> {
		let address = transaction.point.address.clone();
		self.submitted.lock().unwrap().push(address.clone());

		if self.fail_submission.contains(&address) {
			return Err(SignerError::Submission(format!("cannot submit {}", address)));
		}

		if self.fail_wait.contains(&address) {
			return Ok(TransactionResponse::reverted(
				TransactionHash::from(address.as_str()),
				SignerError::Confirmation(format!("{} reverted", address)),
			));
		}

		Ok(TransactionResponse::confirmed(receipt(&address)))
	}

	fn as_batch(&self) -> Option<&dyn OmniBatchSigner> {
		match self.batch {
			Some(_) => Some(self),
			None => None,
		}
	}
}

#[async_trait]
impl OmniBatchSigner for MockSigner {
	async fn sign_and_send_batch(
		&self,
		transactions: &[SharedTransaction],
	) -> Result<TransactionResponse, SignerError> {
		self.submitted
			.lock()
			.unwrap()
			.push(format!("batch of {}", transactions.len()));

		match self.batch {
			Some(BatchBehaviour::FailSubmission) => {
				Err(SignerError::Submission("batch rejected".to_string()))
			}
			Some(BatchBehaviour::FailWait) => Ok(TransactionResponse::reverted(
				TransactionHash::from("0xbatch"),
				SignerError::Confirmation("batch reverted".to_string()),
			)),
			_ => Ok(TransactionResponse::confirmed(receipt("0xbatch"))),
		}
	}
}

/// Factory handing out prepared signers, counting its calls.
#[derive(Default)]
struct MockFactory {
	signers: HashMap<EndpointId, Arc<MockSigner>>,
	calls: AtomicUsize,
}

impl MockFactory {
	fn with(mut self, signer: MockSigner) -> Self {
		self.signers.insert(EndpointId(signer.eid), Arc::new(signer));
		self
	}
}

#[async_trait]
impl SignerFactory for MockFactory {
	async fn create_signer(&self, eid: EndpointId) -> Result<Arc<dyn OmniSigner>, SignerError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		match self.signers.get(&eid) {
			Some(signer) => Ok(signer.clone() as Arc<dyn OmniSigner>),
			None => Err(SignerError::Other(format!("No signer for {}", eid))),
		}
	}
}

fn transactions_of(succeeded: &[OmniTransactionWithReceipt]) -> Vec<SharedTransaction> {
	succeeded.iter().map(|s| s.transaction.clone()).collect()
}

fn on_chain(transactions: &[SharedTransaction], eid: u32) -> Vec<SharedTransaction> {
	transactions
		.iter()
		.filter(|t| t.point.eid == EndpointId(eid))
		.cloned()
		.collect()
}

fn sorted(mut transactions: Vec<SharedTransaction>) -> Vec<SharedTransaction> {
	transactions.sort_by(|a, b| {
		(a.point.eid, a.point.address.clone()).cmp(&(b.point.eid, b.point.address.clone()))
	});
	transactions
}

#[tokio::test]
async fn test_empty_input_resolves_to_empty_result() {
	let factory = Arc::new(MockFactory::default());
	let sign_and_send = create_sign_and_send(factory.clone(), SubmissionConfig::default());

	let (succeeded, failed, pending) = sign_and_send.sign_and_send(&[]).await.into_parts();

	assert!(succeeded.is_empty());
	assert!(failed.is_empty());
	assert!(pending.is_empty());
	assert_eq!(factory.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_resolver_failure_per_chain() {
	let transactions = vec![
		transaction(1, "0xa1"),
		transaction(2, "0xb1"),
		transaction(1, "0xa2"),
		transaction(3, "0xc1"),
	];
	let factory = Arc::new(MockFactory::default());
	let sign_and_send = create_sign_and_send(factory.clone(), SubmissionConfig::default());

	let result = sign_and_send.sign_and_send(&transactions).await;

	assert!(result.succeeded.is_empty());
	assert_eq!(factory.calls.load(Ordering::SeqCst), 3);

	let failed: Vec<_> = result.failed.iter().map(|f| f.transaction.clone()).collect();
	assert_eq!(
		failed,
		vec![
			transactions[0].clone(),
			transactions[1].clone(),
			transactions[3].clone()
		]
	);
	assert_eq!(
		result.failed[0].error,
		SignerError::signer_creation("Unknown (1)", SignerError::Other("No signer for 1".into()))
	);
	assert_eq!(
		result.failed[0].error.to_string(),
		"Failed to create a signer for Unknown (1): No signer for 1"
	);
	assert_eq!(sorted(result.pending), sorted(transactions));
}

#[tokio::test]
async fn test_all_succeed() {
	let transactions = vec![
		transaction(1, "0xa1"),
		transaction(2, "0xb1"),
		transaction(1, "0xa2"),
		transaction(2, "0xb2"),
		transaction(1, "0xa3"),
	];
	let factory = Arc::new(
		MockFactory::default()
			.with(MockSigner::new(1))
			.with(MockSigner::new(2)),
	);
	let sign_and_send = create_sign_and_send(factory.clone(), SubmissionConfig::default());

	let result = sign_and_send.sign_and_send(&transactions).await;

	assert!(result.is_complete());
	assert_eq!(result.succeeded.len(), transactions.len());
	for eid in [1, 2] {
		assert_eq!(
			on_chain(&transactions_of(&result.succeeded), eid),
			on_chain(&transactions, eid)
		);
	}
	for success in &result.succeeded {
		assert_eq!(
			success.receipt.transaction_hash,
			TransactionHash(success.transaction.point.address.clone())
		);
	}

	// One signer per chain
	assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
}

/// `[...first, failed, ...second]` where `failed` and part of `second`
/// share chain 1.
fn first_failure_scenario() -> (
	Vec<SharedTransaction>,
	Vec<SharedTransaction>,
	SharedTransaction,
	Vec<SharedTransaction>,
) {
	let first = vec![
		transaction(1, "0xa1"),
		transaction(2, "0xb1"),
		transaction(1, "0xa2"),
	];
	let failed = transaction(1, "0xfail");
	let second = vec![
		transaction(2, "0xb2"),
		transaction(1, "0xa3"),
		transaction(3, "0xc1"),
		transaction(1, "0xa4"),
	];

	let mut all = first.clone();
	all.push(failed.clone());
	all.extend(second.clone());

	(all, first, failed, second)
}

async fn assert_first_failure_bails(signer: MockSigner, expected_error: SignerError) {
	let (transactions, first, failed, second) = first_failure_scenario();
	let factory = Arc::new(
		MockFactory::default()
			.with(signer)
			.with(MockSigner::new(2))
			.with(MockSigner::new(3)),
	);
	let sign_and_send = create_sign_and_send(factory, SubmissionConfig::default());

	let result = sign_and_send.sign_and_send(&transactions).await;

	let mut expected_succeeded = first.clone();
	expected_succeeded.extend(
		second
			.iter()
			.filter(|t| t.point.eid != EndpointId(1))
			.cloned(),
	);
	assert_eq!(
		sorted(transactions_of(&result.succeeded)),
		sorted(expected_succeeded)
	);

	assert_eq!(
		result.failed,
		vec![OmniTransactionWithError {
			transaction: failed.clone(),
			error: expected_error,
		}]
	);

	let mut expected_pending = vec![failed];
	expected_pending.extend(on_chain(&second, 1));
	assert_eq!(result.pending, expected_pending);
}

#[tokio::test]
async fn test_first_submission_failure_bails() {
	let signer = MockSigner::new(1).failing_submission("0xfail");
	assert_first_failure_bails(
		signer,
		SignerError::Submission("cannot submit 0xfail".to_string()),
	)
	.await;
}

#[tokio::test]
async fn test_first_wait_failure_bails() {
	let signer = MockSigner::new(1).failing_wait("0xfail");
	assert_first_failure_bails(
		signer,
		SignerError::Confirmation("0xfail reverted".to_string()),
	)
	.await;
}

#[tokio::test]
async fn test_nothing_is_submitted_after_a_failure() {
	let (transactions, ..) = first_failure_scenario();
	let signer = Arc::new(MockSigner::new(1).failing_submission("0xfail"));
	let signers: HashMap<EndpointId, Arc<MockSigner>> = [
		(EndpointId(1), signer.clone()),
		(EndpointId(2), Arc::new(MockSigner::new(2))),
		(EndpointId(3), Arc::new(MockSigner::new(3))),
	]
	.into_iter()
	.collect();
	let factory = Arc::new(MockFactory {
		signers,
		calls: AtomicUsize::new(0),
	});

	create_sign_and_send(factory, SubmissionConfig::default())
		.sign_and_send(&transactions)
		.await;

	assert_eq!(
		*signer.submitted.lock().unwrap(),
		vec!["0xa1", "0xa2", "0xfail"]
	);
}

#[tokio::test]
async fn test_batched_wait_changes_pending() {
	let (transactions, first, failed, second) = first_failure_scenario();
	let factory = Arc::new(
		MockFactory::default()
			.with(MockSigner::new(1).failing_wait("0xfail"))
			.with(MockSigner::new(2))
			.with(MockSigner::new(3)),
	);
	let config = SubmissionConfig::new().with_batched_wait(true);
	let sign_and_send = create_sign_and_send(factory, config);

	let result = sign_and_send.sign_and_send(&transactions).await;

	let mut expected_succeeded = first;
	expected_succeeded.extend(second);
	assert_eq!(
		sorted(transactions_of(&result.succeeded)),
		sorted(expected_succeeded)
	);
	assert_eq!(result.failed.len(), 1);
	assert_eq!(result.failed[0].transaction, failed);
	assert_eq!(result.pending, vec![failed]);
}

#[tokio::test]
async fn test_progress_follows_completion_order() {
	let transactions: Vec<_> = (0..5)
		.map(|i| transaction(1, &format!("0x{}", i)))
		.collect();
	let factory = Arc::new(MockFactory::default().with(MockSigner::new(1)));
	let sign_and_send = create_sign_and_send(factory, SubmissionConfig::default());

	let mut calls: Vec<(SharedTransaction, usize)> = Vec::new();
	let result = sign_and_send
		.sign_and_send_with_progress(&transactions, |success, so_far| {
			assert_eq!(so_far.last(), Some(success));
			calls.push((success.transaction.clone(), so_far.len()));
		})
		.await;

	let expected: Vec<_> = transactions
		.iter()
		.cloned()
		.enumerate()
		.map(|(k, transaction)| (transaction, k + 1))
		.collect();
	assert_eq!(calls, expected);
	assert_eq!(result.succeeded.len(), 5);
}

#[tokio::test]
async fn test_progress_covers_every_chain() {
	let transactions = vec![
		transaction(1, "0xa1"),
		transaction(2, "0xb1"),
		transaction(1, "0xa2"),
	];
	let factory = Arc::new(
		MockFactory::default()
			.with(MockSigner::new(1))
			.with(MockSigner::new(2)),
	);
	let sign_and_send = create_sign_and_send(factory, SubmissionConfig::default());

	let mut reported = Vec::new();
	let result = sign_and_send
		.sign_and_send_with_progress(&transactions, |success, _| {
			reported.push(success.transaction.clone())
		})
		.await;

	assert_eq!(sorted(reported.clone()), sorted(transactions.clone()));
	assert_eq!(on_chain(&reported, 1), on_chain(&transactions, 1));
	assert!(result.is_complete());
}

async fn run_batch(
	behaviour: BatchBehaviour,
) -> (Vec<SharedTransaction>, omni_types::SignAndSendResult) {
	let transactions = vec![
		transaction(1, "0xa1"),
		transaction(1, "0xa2"),
		transaction(1, "0xa3"),
	];
	let factory = Arc::new(MockFactory::default().with(MockSigner::new(1).with_batch(behaviour)));
	let config = SubmissionConfig::new().with_batched_send(true);

	let result = create_sign_and_send(factory, config)
		.sign_and_send(&transactions)
		.await;

	(transactions, result)
}

#[tokio::test]
async fn test_batch_send_succeeds_with_shared_receipt() {
	let (transactions, result) = run_batch(BatchBehaviour::Succeed).await;

	assert_eq!(transactions_of(&result.succeeded), transactions);
	assert!(result
		.succeeded
		.iter()
		.all(|s| s.receipt == receipt("0xbatch")));
	assert!(result.failed.is_empty());
	assert!(result.pending.is_empty());
}

#[tokio::test]
async fn test_batch_submission_failure_fails_whole_batch() {
	let (transactions, result) = run_batch(BatchBehaviour::FailSubmission).await;

	assert!(result.succeeded.is_empty());
	assert_eq!(
		result.failed,
		transactions
			.iter()
			.map(|t| OmniTransactionWithError {
				transaction: t.clone(),
				error: SignerError::Submission("batch rejected".to_string()),
			})
			.collect::<Vec<_>>()
	);
	assert_eq!(result.pending, transactions);
}

#[tokio::test]
async fn test_batch_wait_failure_fails_whole_batch() {
	let (transactions, result) = run_batch(BatchBehaviour::FailWait).await;

	assert!(result.succeeded.is_empty());
	assert_eq!(result.failed.len(), 3);
	assert!(result
		.failed
		.iter()
		.all(|f| f.error == SignerError::Confirmation("batch reverted".to_string())));
	assert_eq!(result.pending, transactions);
}

#[tokio::test]
async fn test_batch_send_chunks_by_batch_size() {
	let transactions: Vec<_> = (0..5)
		.map(|i| transaction(1, &format!("0x{}", i)))
		.collect();
	let signer = Arc::new(MockSigner::new(1).with_batch(BatchBehaviour::Succeed));
	let factory = Arc::new(MockFactory {
		signers: [(EndpointId(1), signer.clone())].into_iter().collect(),
		calls: AtomicUsize::new(0),
	});
	let config = SubmissionConfig::new()
		.with_batched_send(true)
		.with_batch_size(2);

	let result = create_sign_and_send(factory, config)
		.sign_and_send(&transactions)
		.await;

	assert!(result.is_complete());
	assert_eq!(transactions_of(&result.succeeded), transactions);
	assert_eq!(
		*signer.submitted.lock().unwrap(),
		vec!["batch of 2", "batch of 2", "batch of 1"]
	);
}

#[tokio::test]
async fn test_partition_completeness() {
	let (transactions, ..) = first_failure_scenario();
	let factory = Arc::new(
		MockFactory::default()
			.with(MockSigner::new(1).failing_submission("0xa2"))
			.with(MockSigner::new(2).failing_wait("0xb2")),
	);
	let sign_and_send = create_sign_and_send(factory, SubmissionConfig::default());

	let result = sign_and_send.sign_and_send(&transactions).await;

	let mut accounted = transactions_of(&result.succeeded);
	accounted.extend(result.pending.clone());
	assert_eq!(sorted(accounted), sorted(transactions.clone()));

	// Chain 3 has no signer, chains 1 and 2 bail
	assert_eq!(result.failed.len(), 3);
	for failure in &result.failed {
		assert!(result.pending.contains(&failure.transaction));
	}
}

/// Signer that either waits for `gate` or opens it before confirming.
struct GatedSigner {
	eid: u32,
	gate: Arc<Notify>,
	opens: bool,
}

#[async_trait]
impl OmniSigner for GatedSigner {
	fn point(&self) -> OmniPoint {
		OmniPoint::new(EndpointId(self.eid), "0xsigner")
	}

	async fn sign(&self, transaction: &OmniTransaction) -> Result<String, SignerError> {
		Ok(format!("signed {}", transaction.point.address))
	}

	async fn sign_and_send(
		&self,
		transaction: &OmniTransaction,
	) -> Result<TransactionResponse, SignerError> {
		if self.opens {
			self.gate.notify_one();
		} else {
			self.gate.notified().await;
		}

		Ok(TransactionResponse::confirmed(receipt(&transaction.point.address)))
	}
}

#[tokio::test]
async fn test_chains_are_submitted_concurrently() {
	let gate = Arc::new(Notify::new());
	let mut signers: HashMap<EndpointId, Arc<dyn OmniSigner>> = HashMap::new();
	// The first chain cannot submit until the second one has.
	signers.insert(
		EndpointId(1),
		Arc::new(GatedSigner {
			eid: 1,
			gate: gate.clone(),
			opens: false,
		}),
	);
	signers.insert(
		EndpointId(2),
		Arc::new(GatedSigner {
			eid: 2,
			gate,
			opens: true,
		}),
	);
	let factory = move |eid: EndpointId| {
		let signer = signers.get(&eid).cloned();
		async move { signer.ok_or_else(|| SignerError::Other(format!("No signer for {}", eid))) }
	};

	let transactions = vec![transaction(1, "0xa1"), transaction(2, "0xb1")];
	let sign_and_send = create_sign_and_send(Arc::new(factory), SubmissionConfig::default());

	let result = timeout(Duration::from_secs(5), sign_and_send.sign_and_send(&transactions))
		.await
		.expect("chains were submitted one after the other");

	assert_eq!(sorted(transactions_of(&result.succeeded)), transactions);
	assert!(result.is_complete());
}
