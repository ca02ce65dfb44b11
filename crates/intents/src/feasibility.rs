//! Point in time check of whether a signed Permit2 transfer can execute.

use {
    crate::{
        chain_state::{ChainReadError, ChainReader},
        metrics::Metrics,
        nonce::is_nonce_used,
    },
    alloy::primitives::{Address, U256},
    futures::future::try_join_all,
    model::permit::Permit2Batch,
    std::fmt::{self, Display, Formatter},
    tracing::instrument,
};

/// A reason why a transfer can not execute right now.
#[derive(Clone, Debug, Eq, PartialEq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Issue {
    DeadlineExpired {
        deadline: U256,
        now: u64,
    },
    NonceUsed {
        nonce: U256,
    },
    InsufficientBalance {
        token: Address,
        required: U256,
        available: U256,
    },
    /// The allowance granted to the Permit2 contract is too low.
    InsufficientAllowance {
        token: Address,
        required: U256,
        available: U256,
    },
}

impl Issue {
    /// Stable snake_case kind of the issue.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::DeadlineExpired { deadline, now } => {
                write!(f, "deadline {deadline} lies before {now}")
            }
            Self::NonceUsed { nonce } => write!(f, "nonce {nonce} was already used"),
            Self::InsufficientBalance {
                token,
                required,
                available,
            } => write!(
                f,
                "balance of {token} is {available} but {required} is required"
            ),
            Self::InsufficientAllowance {
                token,
                required,
                available,
            } => write!(
                f,
                "Permit2 allowance of {token} is {available} but {required} is required"
            ),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Feasibility {
    pub feasible: bool,
    pub issues: Vec<Issue>,
}

impl From<Vec<Issue>> for Feasibility {
    fn from(issues: Vec<Issue>) -> Self {
        Self {
            feasible: issues.is_empty(),
            issues,
        }
    }
}

/// Checks deadline, nonce, balances and Permit2 allowances of `permit` at
/// `now`. All reads are issued concurrently and any failed read fails the
/// whole check. Every issue found is reported.
#[instrument(skip_all, fields(owner = %permit.owner, nonce = %permit.permit.nonce))]
pub async fn check_feasibility(
    reader: &dyn ChainReader,
    permit: &Permit2Batch,
    permit2: Address,
    now: u64,
) -> Result<Feasibility, ChainReadError> {
    let owner = permit.owner;
    let token_checks = permit
        .permit
        .required_amounts()
        .into_iter()
        .map(|(token, required)| async move {
            let (balance, allowance) = futures::try_join!(
                reader.balance_of(token, owner),
                reader.allowance(token, owner, permit2),
            )?;
            let mut issues = Vec::new();
            if balance < required {
                issues.push(Issue::InsufficientBalance {
                    token,
                    required,
                    available: balance,
                });
            }
            if allowance < required {
                issues.push(Issue::InsufficientAllowance {
                    token,
                    required,
                    available: allowance,
                });
            }
            Ok::<_, ChainReadError>(issues)
        });
    let (nonce_used, token_issues) = futures::try_join!(
        is_nonce_used(reader, owner, permit.permit.nonce),
        try_join_all(token_checks),
    )?;

    let mut issues = Vec::new();
    if model::order::validate_deadline(permit.permit.deadline, now).is_err() {
        issues.push(Issue::DeadlineExpired {
            deadline: permit.permit.deadline,
            now,
        });
    }
    if nonce_used {
        issues.push(Issue::NonceUsed {
            nonce: permit.permit.nonce,
        });
    }
    issues.extend(token_issues.into_iter().flatten());

    let metrics = Metrics::get();
    for issue in &issues {
        tracing::debug!(kind = issue.kind(), %issue, "transfer not feasible");
        metrics
            .feasibility_issues
            .with_label_values(&[issue.kind()])
            .inc();
    }
    let feasibility = Feasibility::from(issues);
    metrics
        .feasibility_checks
        .with_label_values(&[if feasibility.feasible {
            "feasible"
        } else {
            "infeasible"
        }])
        .inc();
    Ok(feasibility)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::chain_state::MockChainReader,
        alloy::primitives::Bytes,
        mockall::predicate::eq,
        model::{
            PERMIT2_ADDRESS,
            permit::{PermitBatchTransferFrom, TokenPermissions},
        },
        std::time::Duration,
    };

    const OWNER: Address = Address::repeat_byte(0x01);
    const TOKEN_A: Address = Address::repeat_byte(0xaa);
    const TOKEN_B: Address = Address::repeat_byte(0xbb);
    const NOW: u64 = 1_700_000_000;

    fn permit(permitted: Vec<TokenPermissions>) -> Permit2Batch {
        Permit2Batch {
            permit: PermitBatchTransferFrom {
                permitted,
                nonce: U256::from(42),
                deadline: U256::from(NOW + 60),
            },
            owner: OWNER,
            signature: Bytes::from(vec![0u8; 65]),
        }
    }

    fn permission(token: Address, amount: u64) -> TokenPermissions {
        TokenPermissions {
            token,
            amount: U256::from(amount),
        }
    }

    fn reader(balance: u64, allowance: u64) -> MockChainReader {
        let mut reader = MockChainReader::new();
        reader
            .expect_nonce_bitmap()
            .with(eq(OWNER), eq(U256::ZERO))
            .returning(|_, _| Ok(U256::ZERO));
        reader
            .expect_balance_of()
            .returning(move |_, _| Ok(U256::from(balance)));
        reader
            .expect_allowance()
            .with(mockall::predicate::always(), eq(OWNER), eq(PERMIT2_ADDRESS))
            .returning(move |_, _, _| Ok(U256::from(allowance)));
        reader
    }

    #[tokio::test]
    async fn feasible() {
        let result = check_feasibility(
            &reader(100, 100),
            &permit(vec![permission(TOKEN_A, 100)]),
            PERMIT2_ADDRESS,
            NOW,
        )
        .await
        .unwrap();
        assert_eq!(
            result,
            Feasibility {
                feasible: true,
                issues: vec![],
            }
        );
    }

    #[tokio::test]
    async fn insufficient_balance() {
        let result = check_feasibility(
            &reader(50, 1000),
            &permit(vec![permission(TOKEN_A, 100)]),
            PERMIT2_ADDRESS,
            NOW,
        )
        .await
        .unwrap();
        assert!(!result.feasible);
        assert_eq!(
            result.issues,
            vec![Issue::InsufficientBalance {
                token: TOKEN_A,
                required: U256::from(100),
                available: U256::from(50),
            }]
        );
        assert_eq!(result.issues[0].kind(), "insufficient_balance");
    }

    #[tokio::test]
    async fn reports_every_issue() {
        let result = check_feasibility(
            &reader(50, 10),
            &permit(vec![permission(TOKEN_A, 100)]),
            PERMIT2_ADDRESS,
            NOW,
        )
        .await
        .unwrap();
        let kinds = result.issues.iter().map(Issue::kind).collect::<Vec<_>>();
        assert_eq!(kinds, ["insufficient_balance", "insufficient_allowance"]);
        assert_eq!(
            result.issues[1],
            Issue::InsufficientAllowance {
                token: TOKEN_A,
                required: U256::from(100),
                available: U256::from(10),
            }
        );
    }

    #[tokio::test]
    async fn expired_deadline_and_used_nonce() {
        let mut reader = MockChainReader::new();
        reader
            .expect_nonce_bitmap()
            .returning(|_, _| Ok(U256::from(1) << 42));
        reader
            .expect_balance_of()
            .returning(|_, _| Ok(U256::MAX));
        reader
            .expect_allowance()
            .returning(|_, _, _| Ok(U256::MAX));

        let permit = permit(vec![permission(TOKEN_A, 100)]);
        let result = check_feasibility(&reader, &permit, PERMIT2_ADDRESS, NOW + 61)
            .await
            .unwrap();
        assert_eq!(
            result.issues,
            vec![
                Issue::DeadlineExpired {
                    deadline: U256::from(NOW + 60),
                    now: NOW + 61,
                },
                Issue::NonceUsed {
                    nonce: U256::from(42),
                },
            ]
        );

        let result = check_feasibility(&reader, &permit, PERMIT2_ADDRESS, NOW + 60)
            .await
            .unwrap();
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind(), "nonce_used");
    }

    #[tokio::test]
    async fn sums_permits_per_token() {
        let mut reader = MockChainReader::new();
        reader.expect_nonce_bitmap().returning(|_, _| Ok(U256::ZERO));
        reader
            .expect_balance_of()
            .with(eq(TOKEN_A), eq(OWNER))
            .times(1)
            .returning(|_, _| Ok(U256::from(150)));
        reader
            .expect_balance_of()
            .with(eq(TOKEN_B), eq(OWNER))
            .times(1)
            .returning(|_, _| Ok(U256::from(5)));
        reader
            .expect_allowance()
            .returning(|_, _, _| Ok(U256::MAX));

        let result = check_feasibility(
            &reader,
            &permit(vec![
                permission(TOKEN_A, 100),
                permission(TOKEN_B, 5),
                permission(TOKEN_A, 100),
            ]),
            PERMIT2_ADDRESS,
            NOW,
        )
        .await
        .unwrap();
        assert_eq!(
            result.issues,
            vec![Issue::InsufficientBalance {
                token: TOKEN_A,
                required: U256::from(200),
                available: U256::from(150),
            }]
        );
    }

    #[tokio::test]
    async fn failed_read_fails_check() {
        let mut reader = MockChainReader::new();
        reader.expect_nonce_bitmap().returning(|_, _| Ok(U256::ZERO));
        reader.expect_balance_of().returning(|_, _| Ok(U256::MAX));
        reader.expect_allowance().returning(|_, _, _| {
            Err(ChainReadError::Timeout {
                method: "allowance",
                timeout: Duration::from_secs(10),
            })
        });

        let err = check_feasibility(
            &reader,
            &permit(vec![permission(TOKEN_A, 100)]),
            PERMIT2_ADDRESS,
            NOW,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "timeout");
    }

    #[test]
    fn renders_issue() {
        let issue = Issue::InsufficientBalance {
            token: TOKEN_A,
            required: U256::from(100),
            available: U256::from(50),
        };
        assert!(issue.to_string().contains("is 50 but 100 is required"));
    }
}
