//! The built-in agent catalog: one profile and playbook per role.

use std::time::Duration;

use crate::agent::{AgentProfile, PerformanceSpec};
use crate::playbook::{Playbook, Section};
use crate::roles::AgentRole;

/// Everything needed to build a catalog agent.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub role: AgentRole,
    pub profile: AgentProfile,
    /// Confidence for domain-matched answers
    pub base_confidence: f64,
    pub playbook: Playbook,
}

fn capabilities(role: AgentRole) -> &'static [&'static str] {
    match role {
        AgentRole::Architecture => &[
            "ddd",
            "microservices",
            "integration-patterns",
            "system-design",
            "boundaries",
            "pos-domain",
            "technology-stack",
            "java21",
            "spring-boot",
            "aws-patterns",
        ],
        AgentRole::Implementation => &[
            "spring-boot",
            "java",
            "business-logic",
            "data-access",
            "rest-api",
            "microservices",
        ],
        AgentRole::Deployment => &[
            "docker",
            "kubernetes",
            "ecs",
            "ci-cd",
            "containerization",
            "infrastructure",
            "java21",
            "opentelemetry",
            "monitoring",
            "postgresql",
            "postgres",
            "elasticache",
            "secrets",
            "security",
            "deployment",
        ],
        AgentRole::Testing => &[
            "unit-testing",
            "integration-testing",
            "contract-testing",
            "quality-assurance",
            "test-automation",
            "tdd",
            "test-driven-development",
            "property-based-testing",
            "jqwik",
            "junit5",
            "mockito",
            "pact",
            "spring-boot-test",
            "testing",
        ],
        AgentRole::Security => &[
            "jwt",
            "spring-security",
            "authentication",
            "authorization",
            "owasp",
            "input-validation",
            "secrets-manager",
            "iam",
            "encryption",
            "tls",
            "ssl",
            "api-security",
            "rate-limiting",
            "threat-protection",
            "oauth2",
            "cors",
            "csrf",
            "xss",
            "sql-injection",
            "security-headers",
            "password-hashing",
        ],
        AgentRole::Observability => &[
            "opentelemetry",
            "metrics",
            "tracing",
            "monitoring",
            "grafana",
            "prometheus",
            "jaeger",
            "red-metrics",
            "instrumentation",
            "observability",
            "telemetry",
            "dashboards",
            "alerts",
            "logging",
            "apm",
            "distributed-tracing",
            "sli",
            "slo",
            "performance",
            "performance-monitoring",
        ],
        AgentRole::Documentation => &[
            "technical-docs",
            "readme",
            "architectural-docs",
            "api-docs",
            "openapi",
            "swagger",
            "documentation",
            "markdown",
            "asciidoc",
            "javadoc",
            "spring-rest-docs",
            "confluence",
            "wiki",
            "changelog",
            "release-notes",
            "user-guides",
            "developer-guides",
        ],
        AgentRole::BusinessDomain => &[
            "pos-domain",
            "business-rules",
            "payment-integration",
            "workflow-design",
            "third-party-apis",
            "distributed-transactions",
            "eventual-consistency",
            "automotive-services",
            "compliance",
        ],
        AgentRole::IntegrationGateway => &[
            "api-gateway",
            "rest-api",
            "openapi",
            "routing",
            "rate-limiting",
            "authentication",
            "authorization",
            "versioning",
            "caching",
            "compression",
            "error-handling",
            "contract-testing",
            "cors",
            "oauth2",
            "jwt",
        ],
        AgentRole::ArchitecturalGovernance => &[
            "domain-boundaries",
            "technical-debt",
            "adrs",
            "migration",
            "ddd-enforcement",
            "circular-dependency",
            "versioning",
            "pos-patterns",
            "governance",
        ],
        AgentRole::PairNavigator => &[
            "loop-detection",
            "stop-phrases",
            "drift-prevention",
            "simplification",
            "pair-programming",
        ],
        AgentRole::EventDriven => &[
            "event-driven",
            "event-schemas",
            "kafka",
            "sns-sqs",
            "rabbitmq",
            "event-sourcing",
            "idempotency",
            "message-brokers",
            "async-communication",
            "event-handlers",
            "messaging",
        ],
        AgentRole::CicdPipeline => &[
            "cicd",
            "build-automation",
            "maven",
            "gradle",
            "testing-pipelines",
            "deployment-strategies",
            "security-scanning",
            "jenkins",
            "github-actions",
            "gitlab-ci",
            "blue-green",
            "canary",
            "rolling-deployment",
            "pipeline",
        ],
        AgentRole::ConfigurationManagement => &[
            "configuration",
            "centralized-config",
            "spring-cloud-config",
            "consul",
            "etcd",
            "feature-flags",
            "secrets-management",
            "aws-secrets-manager",
            "hashicorp-vault",
            "kubernetes-secrets",
            "config-validation",
            "environment-configs",
            "config-drift-detection",
        ],
        AgentRole::ResilienceEngineering => &[
            "resilience",
            "circuit-breaker",
            "circuit-breakers",
            "hystrix",
            "resilience4j",
            "spring-cloud-circuit-breaker",
            "retry-patterns",
            "exponential-backoff",
            "bulkhead-pattern",
            "chaos-engineering",
            "chaos-monkey",
            "failure-injection",
            "health-monitoring",
            "system-reliability",
            "performance-tuning",
        ],
    }
}

fn dependencies(role: AgentRole) -> &'static [AgentRole] {
    match role {
        AgentRole::Architecture
        | AgentRole::Security
        | AgentRole::Observability
        | AgentRole::Documentation
        | AgentRole::IntegrationGateway => &[],
        AgentRole::Implementation | AgentRole::ArchitecturalGovernance => {
            &[AgentRole::Architecture]
        }
        AgentRole::Deployment | AgentRole::Testing | AgentRole::PairNavigator => {
            &[AgentRole::Implementation]
        }
        AgentRole::BusinessDomain => &[AgentRole::Architecture, AgentRole::IntegrationGateway],
        AgentRole::EventDriven => &[AgentRole::Architecture, AgentRole::ResilienceEngineering],
        AgentRole::CicdPipeline => &[AgentRole::Security, AgentRole::Testing],
        AgentRole::ConfigurationManagement => &[AgentRole::Security],
        AgentRole::ResilienceEngineering => &[AgentRole::Observability, AgentRole::Testing],
    }
}

fn priority(role: AgentRole) -> u32 {
    match role {
        AgentRole::Architecture => 100,
        AgentRole::Security => 95,
        AgentRole::Implementation => 90,
        AgentRole::ArchitecturalGovernance => 85,
        AgentRole::Deployment => 80,
        AgentRole::PairNavigator => 80,
        AgentRole::EventDriven => 78,
        AgentRole::IntegrationGateway => 75,
        AgentRole::ResilienceEngineering => 74,
        AgentRole::CicdPipeline => 72,
        AgentRole::Testing => 70,
        AgentRole::ConfigurationManagement => 68,
        AgentRole::Observability => 65,
        AgentRole::BusinessDomain => 60,
        AgentRole::Documentation => 50,
    }
}

fn base_confidence(role: AgentRole) -> f64 {
    match role {
        AgentRole::Testing => 0.96,
        AgentRole::Architecture | AgentRole::PairNavigator => 0.95,
        AgentRole::Implementation | AgentRole::Security | AgentRole::Documentation => 0.94,
        AgentRole::Deployment | AgentRole::ResilienceEngineering => 0.93,
        AgentRole::Observability
        | AgentRole::IntegrationGateway
        | AgentRole::ArchitecturalGovernance
        | AgentRole::EventDriven => 0.92,
        AgentRole::CicdPipeline => 0.91,
        AgentRole::BusinessDomain | AgentRole::ConfigurationManagement => 0.90,
    }
}

fn performance(role: AgentRole) -> PerformanceSpec {
    let max_latency = match role {
        AgentRole::PairNavigator => Duration::from_secs(2),
        _ => Duration::from_secs(3),
    };
    PerformanceSpec {
        max_latency,
        min_confidence: base_confidence(role),
        max_concurrent: 256,
    }
}

fn playbook(role: AgentRole) -> Playbook {
    match role {
        AgentRole::Architecture => Playbook {
            sections: &[
                Section {
                    triggers: &["ddd", "domain", "bounded context", "boundaries"],
                    heading: "Domain-Driven Design",
                    points: &[
                        "Model each bounded context around one business capability",
                        "Keep aggregates small and enforce invariants inside them",
                        "Publish domain events at aggregate boundaries",
                    ],
                    recommendations: &[
                        "Map bounded contexts before splitting services",
                        "Keep one aggregate root per transaction",
                    ],
                },
                Section {
                    triggers: &["microservice", "service", "decompose"],
                    heading: "Service Decomposition",
                    points: &[
                        "Align service boundaries with bounded contexts",
                        "Give every service ownership of its data store",
                        "Prefer explicit API contracts between services",
                    ],
                    recommendations: &[
                        "Give each service ownership of its own data",
                        "Version service contracts from day one",
                    ],
                },
                Section {
                    triggers: &["aws", "cloud", "scalability", "scale"],
                    heading: "Cloud Patterns",
                    points: &[
                        "Use managed services where operational load is high",
                        "Design for horizontal scaling behind a load balancer",
                    ],
                    recommendations: &["Design for horizontal scaling"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Architecture Principles",
                points: &[
                    "Document key decisions as ADRs",
                    "Keep dependencies pointing towards the domain core",
                ],
                recommendations: &[
                    "Record architecture decisions as ADRs",
                    "Keep dependencies pointing towards the domain core",
                ],
            },
        },
        AgentRole::Implementation => Playbook {
            sections: &[
                Section {
                    triggers: &["spring boot", "spring", "java"],
                    heading: "Spring Boot Implementation",
                    points: &[
                        "Use constructor injection for all collaborators",
                        "Group code by feature package",
                        "Externalize configuration with typed properties",
                    ],
                    recommendations: &[
                        "Use constructor injection",
                        "Bind configuration to typed properties classes",
                    ],
                },
                Section {
                    triggers: &["rest", "api", "endpoint", "controller"],
                    heading: "REST API Design",
                    points: &[
                        "Validate request bodies at the controller edge",
                        "Return problem-details error payloads",
                        "Keep controllers thin and delegate to services",
                    ],
                    recommendations: &[
                        "Validate request payloads at the API edge",
                        "Return structured problem-details errors",
                    ],
                },
                Section {
                    triggers: &["data", "repository", "database", "jpa", "persistence"],
                    heading: "Data Access",
                    points: &[
                        "Use repositories per aggregate root",
                        "Keep transactions at the service layer",
                        "Manage schema changes with Flyway migrations",
                    ],
                    recommendations: &[
                        "Manage schema changes with versioned migrations",
                        "Keep transactions at the service layer",
                    ],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Implementation Practices",
                points: &[
                    "Write small cohesive classes",
                    "Cover business logic with focused unit tests",
                ],
                recommendations: &[
                    "Keep business logic in the service layer",
                    "Write focused unit tests alongside the code",
                ],
            },
        },
        AgentRole::Deployment => Playbook {
            sections: &[
                Section {
                    triggers: &["kubernetes", "k8s", "helm"],
                    heading: "Kubernetes Deployment Patterns",
                    points: &[
                        "Use Deployment resources with readiness and liveness probes",
                        "Set resource requests and limits for every container",
                        "Scale with the Horizontal Pod Autoscaler",
                    ],
                    recommendations: &[
                        "Configure readiness and liveness probes",
                        "Set resource requests and limits",
                    ],
                },
                Section {
                    triggers: &["ecs", "fargate"],
                    heading: "ECS Cluster Management",
                    points: &[
                        "Run tasks on Fargate with right-sized task definitions",
                        "Attach an Application Load Balancer per service",
                    ],
                    recommendations: &["Right-size ECS task definitions"],
                },
                Section {
                    triggers: &["docker", "container", "image"],
                    heading: "Containerization",
                    points: &[
                        "Use multi-stage builds on a slim JRE base image",
                        "Run the process as a non-root user",
                        "Add a HEALTHCHECK instruction",
                    ],
                    recommendations: &[
                        "Use multi-stage container builds",
                        "Run containers as a non-root user",
                    ],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Deployment Practices",
                points: &[
                    "Automate every environment from the same pipeline",
                    "Roll out gradually and watch health signals",
                ],
                recommendations: &[
                    "Promote the same artifact through every environment",
                    "Roll out gradually while watching health signals",
                ],
            },
        },
        AgentRole::Testing => Playbook {
            sections: &[
                Section {
                    triggers: &["unit", "tdd", "test driven"],
                    heading: "Unit Testing",
                    points: &[
                        "Test behaviour through public interfaces",
                        "Use JUnit 5 with descriptive display names",
                    ],
                    recommendations: &[
                        "Test behaviour through public interfaces",
                        "Keep unit tests fast and isolated",
                    ],
                },
                Section {
                    triggers: &["integration", "contract", "pact"],
                    heading: "Integration and Contract Testing",
                    points: &[
                        "Run integration tests against Testcontainers",
                        "Verify consumer contracts with Pact in the pipeline",
                    ],
                    recommendations: &[
                        "Use Testcontainers for integration tests",
                        "Verify consumer contracts in the pipeline",
                    ],
                },
                Section {
                    triggers: &["property", "jqwik", "generative"],
                    heading: "Property-Based Testing",
                    points: &[
                        "Express invariants as properties",
                        "Let the framework shrink failing inputs",
                    ],
                    recommendations: &["Express core invariants as property tests"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Test Strategy",
                points: &[
                    "Balance the test pyramid",
                    "Track coverage of critical paths",
                ],
                recommendations: &[
                    "Balance the test pyramid",
                    "Track coverage of critical business paths",
                ],
            },
        },
        AgentRole::Security => Playbook {
            sections: &[
                Section {
                    triggers: &["jwt", "token", "authentication", "oauth2", "login"],
                    heading: "Authentication",
                    points: &[
                        "Issue short-lived JWT access tokens signed with RS256",
                        "Validate issuer, audience and expiry on every request",
                        "Store refresh tokens server side and rotate them on use",
                    ],
                    recommendations: &[
                        "Use short-lived access tokens",
                        "Validate issuer and audience claims on every request",
                        "Rotate signing keys regularly",
                    ],
                },
                Section {
                    triggers: &["authorization", "role", "permission", "rbac"],
                    heading: "Authorization",
                    points: &[
                        "Apply method-level security for sensitive operations",
                        "Grant least privilege through role hierarchies",
                    ],
                    recommendations: &["Grant least privilege per role"],
                },
                Section {
                    triggers: &["owasp", "xss", "csrf", "injection", "input"],
                    heading: "OWASP Hardening",
                    points: &[
                        "Validate and encode all untrusted input",
                        "Use parameterized queries everywhere",
                        "Enable security headers and CSRF protection",
                    ],
                    recommendations: &[
                        "Validate all untrusted input",
                        "Use parameterized queries",
                    ],
                },
                Section {
                    triggers: &["secret", "vault", "encryption", "tls", "ssl"],
                    heading: "Secrets and Encryption",
                    points: &[
                        "Keep secrets in a managed secret store",
                        "Terminate TLS 1.2 or newer at the edge",
                    ],
                    recommendations: &["Keep secrets in a managed secret store"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Security Baseline",
                points: &[
                    "Start from a threat model of the service",
                    "Review dependencies for known vulnerabilities",
                ],
                recommendations: &[
                    "Threat-model the service",
                    "Scan dependencies for known vulnerabilities",
                ],
            },
        },
        AgentRole::Observability => Playbook {
            sections: &[
                Section {
                    triggers: &["metric", "prometheus", "grafana", "dashboard"],
                    heading: "Metrics",
                    points: &[
                        "Publish RED metrics for every endpoint",
                        "Build Grafana dashboards per service",
                    ],
                    recommendations: &[
                        "Publish rate, error and duration metrics per endpoint",
                        "Alert on SLO burn rates",
                    ],
                },
                Section {
                    triggers: &["tracing", "trace", "opentelemetry", "jaeger"],
                    heading: "Distributed Tracing",
                    points: &[
                        "Instrument services with OpenTelemetry",
                        "Propagate trace context across service calls",
                    ],
                    recommendations: &[
                        "Instrument services with OpenTelemetry",
                        "Propagate trace context across calls",
                    ],
                },
                Section {
                    triggers: &["performance", "latency", "throughput", "slow"],
                    heading: "Performance Monitoring",
                    points: &[
                        "Track p95 and p99 latency per endpoint",
                        "Profile hot paths before optimizing",
                    ],
                    recommendations: &[
                        "Track p95 and p99 latency",
                        "Profile hot paths before optimizing",
                    ],
                },
                Section {
                    triggers: &["logging", "log"],
                    heading: "Structured Logging",
                    points: &[
                        "Emit JSON logs with correlation ids",
                        "Centralize logs with retention policies",
                    ],
                    recommendations: &["Emit structured logs with correlation ids"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Observability Baseline",
                points: &[
                    "Define SLIs and SLOs for user journeys",
                    "Combine metrics, traces and logs",
                ],
                recommendations: &[
                    "Define SLIs and SLOs per user journey",
                    "Correlate metrics with traces and logs",
                ],
            },
        },
        AgentRole::Documentation => Playbook {
            sections: &[
                Section {
                    triggers: &["api", "openapi", "swagger"],
                    heading: "API Documentation",
                    points: &[
                        "Generate OpenAPI specifications from code",
                        "Publish examples for every endpoint",
                    ],
                    recommendations: &[
                        "Generate OpenAPI specs from code",
                        "Publish request and response examples",
                    ],
                },
                Section {
                    triggers: &["readme", "guide", "onboarding"],
                    heading: "Developer Guides",
                    points: &[
                        "Keep a README with build and run instructions",
                        "Maintain onboarding guides next to the code",
                    ],
                    recommendations: &["Keep build and run steps in the README"],
                },
                Section {
                    triggers: &["changelog", "release"],
                    heading: "Release Notes",
                    points: &["Maintain a changelog per release"],
                    recommendations: &["Maintain a changelog per release"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Documentation Practices",
                points: &[
                    "Treat docs as code in version control",
                    "Review docs together with code changes",
                ],
                recommendations: &[
                    "Keep documentation in version control",
                    "Review docs together with code changes",
                ],
            },
        },
        AgentRole::BusinessDomain => Playbook {
            sections: &[
                Section {
                    triggers: &["payment", "checkout", "invoice"],
                    heading: "Payment Integration",
                    points: &[
                        "Tokenize card data through the payment provider",
                        "Reconcile settlements daily",
                    ],
                    recommendations: &[
                        "Tokenize card data through the provider",
                        "Reconcile settlements daily",
                    ],
                },
                Section {
                    triggers: &["workflow", "transaction", "saga"],
                    heading: "Business Workflows",
                    points: &[
                        "Coordinate long-running workflows with sagas",
                        "Define compensating actions for each step",
                    ],
                    recommendations: &["Define compensating actions for each workflow step"],
                },
                Section {
                    triggers: &["rule", "compliance", "pricing"],
                    heading: "Business Rules",
                    points: &[
                        "Keep business rules in the domain layer",
                        "Capture compliance requirements as tests",
                    ],
                    recommendations: &["Capture compliance rules as executable tests"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Domain Modelling",
                points: &[
                    "Use the ubiquitous language of the business",
                    "Validate models with domain experts",
                ],
                recommendations: &["Validate the model with domain experts"],
            },
        },
        AgentRole::IntegrationGateway => Playbook {
            sections: &[
                Section {
                    triggers: &["gateway", "routing", "route"],
                    heading: "API Gateway",
                    points: &[
                        "Centralize routing and cross-cutting policies at the gateway",
                        "Apply rate limiting per client",
                    ],
                    recommendations: &[
                        "Apply rate limits per client at the gateway",
                        "Centralize cross-cutting policies at the gateway",
                    ],
                },
                Section {
                    triggers: &["version", "versioning", "contract"],
                    heading: "API Versioning",
                    points: &["Version APIs in the path", "Deprecate versions with notice"],
                    recommendations: &["Version public APIs explicitly"],
                },
                Section {
                    triggers: &["external", "third party", "integration", "partner"],
                    heading: "External Integrations",
                    points: &[
                        "Wrap partner APIs behind anti-corruption adapters",
                        "Set timeouts on all outbound calls",
                    ],
                    recommendations: &[
                        "Wrap partner APIs behind adapters",
                        "Set timeouts on outbound calls",
                    ],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Integration Practices",
                points: &["Publish OpenAPI contracts", "Handle errors consistently"],
                recommendations: &["Publish API contracts for every integration"],
            },
        },
        AgentRole::ArchitecturalGovernance => Playbook {
            sections: &[
                Section {
                    triggers: &["adr", "decision"],
                    heading: "Architecture Decision Records",
                    points: &["Capture context, decision and consequences in each ADR"],
                    recommendations: &["Record architecture decisions as ADRs"],
                },
                Section {
                    triggers: &["debt", "migration", "refactor"],
                    heading: "Technical Debt",
                    points: &[
                        "Track debt items with owners and deadlines",
                        "Plan migrations in small reversible steps",
                    ],
                    recommendations: &[
                        "Track technical debt with named owners",
                        "Plan migrations in small reversible steps",
                    ],
                },
                Section {
                    triggers: &["boundary", "boundaries", "dependency", "circular"],
                    heading: "Boundary Enforcement",
                    points: &[
                        "Check module dependencies in the build",
                        "Break dependency cycles through published events",
                    ],
                    recommendations: &["Check module dependencies in the build"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Governance Practices",
                points: &["Review architecture fitness regularly"],
                recommendations: &["Review architecture fitness functions each quarter"],
            },
        },
        AgentRole::PairNavigator => Playbook {
            sections: &[
                Section {
                    triggers: &["stuck", "loop", "again"],
                    heading: "Loop Detection",
                    points: &[
                        "Step back after two failed attempts at the same fix",
                        "Restate the goal before the next change",
                    ],
                    recommendations: &[
                        "Restate the goal before the next attempt",
                        "Timebox each debugging attempt",
                    ],
                },
                Section {
                    triggers: &["simplify", "complex", "refactor"],
                    heading: "Simplification",
                    points: &["Reduce the change to the smallest useful step"],
                    recommendations: &["Shrink the change to the smallest useful step"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Navigation",
                points: &["Agree on the next small step", "Keep the session goal visible"],
                recommendations: &["Agree on the next small step"],
            },
        },
        AgentRole::EventDriven => Playbook {
            sections: &[
                Section {
                    triggers: &["kafka", "rabbitmq", "broker", "sqs", "sns", "messaging"],
                    heading: "Message Brokers",
                    points: &[
                        "Partition topics by aggregate id",
                        "Route poison messages to a dead letter queue",
                    ],
                    recommendations: &[
                        "Partition topics by aggregate id",
                        "Route poison messages to a dead letter queue",
                    ],
                },
                Section {
                    triggers: &["schema", "event"],
                    heading: "Event Schemas",
                    points: &[
                        "Register schemas and enforce compatibility",
                        "Version events explicitly",
                    ],
                    recommendations: &["Register event schemas with compatibility checks"],
                },
                Section {
                    triggers: &["idempotent", "idempotency", "duplicate"],
                    heading: "Idempotency",
                    points: &["Deduplicate by event id in consumers"],
                    recommendations: &["Make consumers idempotent by event id"],
                },
                Section {
                    triggers: &["sourcing", "cqrs"],
                    heading: "Event Sourcing",
                    points: &[
                        "Persist state changes as an append-only log",
                        "Build read models from projections",
                    ],
                    recommendations: &["Build read models from event projections"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Event-Driven Practices",
                points: &["Publish domain events after commit"],
                recommendations: &["Publish domain events through a transactional outbox"],
            },
        },
        AgentRole::CicdPipeline => Playbook {
            sections: &[
                Section {
                    triggers: &["pipeline", "jenkins", "github actions", "gitlab"],
                    heading: "Pipeline Design",
                    points: &[
                        "Build once and promote the artifact",
                        "Gate merges on tests and static analysis",
                    ],
                    recommendations: &[
                        "Build once and promote the same artifact",
                        "Gate merges on tests and static analysis",
                    ],
                },
                Section {
                    triggers: &["maven", "gradle", "build"],
                    heading: "Build Automation",
                    points: &["Cache dependencies between builds", "Pin plugin versions"],
                    recommendations: &["Cache build dependencies"],
                },
                Section {
                    triggers: &["blue green", "canary", "rolling", "release"],
                    heading: "Deployment Strategies",
                    points: &[
                        "Shift traffic gradually with canary releases",
                        "Keep a one-step rollback path",
                    ],
                    recommendations: &[
                        "Shift traffic gradually during releases",
                        "Keep a one-step rollback path",
                    ],
                },
                Section {
                    triggers: &["sast", "dast", "scan", "scanning"],
                    heading: "Security Scanning",
                    points: &["Run SAST on every merge request", "Run DAST against staging"],
                    recommendations: &["Run SAST on every merge request"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "CI/CD Practices",
                points: &["Keep the main branch releasable"],
                recommendations: &["Keep the main branch releasable"],
            },
        },
        AgentRole::ConfigurationManagement => Playbook {
            sections: &[
                Section {
                    triggers: &["consul", "etcd", "spring cloud config", "centralized"],
                    heading: "Centralized Configuration",
                    points: &[
                        "Serve configuration from a central store",
                        "Refresh configuration at runtime",
                    ],
                    recommendations: &["Serve configuration from a central store"],
                },
                Section {
                    triggers: &["feature flag", "toggle", "flag"],
                    heading: "Feature Flags",
                    points: &[
                        "Give every flag an owner and expiry",
                        "Clean up flags after rollout",
                    ],
                    recommendations: &["Give every feature flag an owner and expiry date"],
                },
                Section {
                    triggers: &["vault", "secret", "secrets"],
                    heading: "Secrets Management",
                    points: &[
                        "Fetch secrets from Vault or AWS Secrets Manager at startup",
                        "Rotate credentials automatically",
                    ],
                    recommendations: &[
                        "Keep secrets in a managed secret store",
                        "Rotate credentials automatically",
                    ],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Configuration Practices",
                points: &["Validate configuration at startup", "Detect config drift"],
                recommendations: &[
                    "Validate configuration at startup",
                    "Detect configuration drift between environments",
                ],
            },
        },
        AgentRole::ResilienceEngineering => Playbook {
            sections: &[
                Section {
                    triggers: &["circuit breaker", "resilience4j", "hystrix"],
                    heading: "Circuit Breakers",
                    points: &[
                        "Wrap remote calls with Resilience4j circuit breakers",
                        "Provide fallbacks for degraded dependencies",
                    ],
                    recommendations: &[
                        "Wrap remote calls in circuit breakers",
                        "Provide fallbacks for degraded dependencies",
                    ],
                },
                Section {
                    triggers: &["retry", "backoff", "timeout"],
                    heading: "Retries",
                    points: &["Retry with exponential backoff and jitter", "Bound total retry time"],
                    recommendations: &["Retry with exponential backoff and jitter"],
                },
                Section {
                    triggers: &["bulkhead", "rate limit", "isolation"],
                    heading: "Bulkheads",
                    points: &["Isolate thread pools per dependency"],
                    recommendations: &["Isolate resources per dependency with bulkheads"],
                },
                Section {
                    triggers: &["chaos", "failure injection"],
                    heading: "Chaos Engineering",
                    points: &["Run controlled failure experiments in staging"],
                    recommendations: &["Run controlled failure experiments"],
                },
            ],
            fallback: Section {
                triggers: &[],
                heading: "Resilience Practices",
                points: &["Set timeouts on every remote call", "Monitor dependency health"],
                recommendations: &["Set timeouts on every remote call"],
            },
        },
    }
}

/// Build the catalog entry for a role.
pub fn entry(role: AgentRole) -> CatalogEntry {
    let profile = AgentProfile::new(role.agent_id(), role.display_name(), role.domain())
        .with_capabilities(capabilities(role).iter().copied())
        .with_dependencies(dependencies(role).iter().map(|d| d.agent_id()))
        .with_priority(priority(role))
        .with_performance(performance(role));

    CatalogEntry {
        role,
        profile,
        base_confidence: base_confidence(role),
        playbook: playbook(role),
    }
}

/// Entries for every role, in declaration order.
pub fn entries() -> Vec<CatalogEntry> {
    AgentRole::all().into_iter().map(entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEGATIONS: &[&str] = &["avoid", "never", "not", "no", "don't", "without", "disable"];

    #[test]
    fn test_catalog_has_every_role() {
        let entries = entries();
        assert_eq!(entries.len(), 15);
        for entry in &entries {
            assert!(!entry.profile.capabilities.is_empty(), "{}", entry.profile.id);
            assert!(entry.base_confidence >= 0.85, "{}", entry.profile.id);
        }
    }

    #[test]
    fn test_dependencies_reference_catalog_agents() {
        let ids: Vec<String> = AgentRole::all().iter().map(|r| r.agent_id()).collect();
        for entry in entries() {
            for dep in &entry.profile.dependencies {
                assert!(ids.contains(dep), "{} -> {}", entry.profile.id, dep);
            }
        }
    }

    #[test]
    fn test_recommendations_are_affirmative() {
        for entry in entries() {
            let sections = entry
                .playbook
                .sections
                .iter()
                .chain(std::iter::once(&entry.playbook.fallback));
            for section in sections {
                assert!(!section.recommendations.is_empty(), "{}", section.heading);
                for rec in section.recommendations {
                    let lower = rec.to_lowercase();
                    for word in lower.split_whitespace() {
                        assert!(!NEGATIONS.contains(&word), "{}: {}", entry.profile.id, rec);
                    }
                }
            }
        }
    }

    #[test]
    fn test_performance_domain_is_covered() {
        let covered = entries()
            .iter()
            .any(|e| crate::matching::domain_covered_by("performance", &e.profile.capabilities));
        assert!(covered);
    }
}
