//! Per-kind descriptor tables.

use super::{
    BusyGuard, FieldDescriptor, FieldShape, KeyPart, KeySource, Kind, KindDescriptor, Mutability,
    ReferenceDescriptor, Slot,
};

const fn scalar(path: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        path,
        mutability: Mutability::Patchable,
        shape: FieldShape::Scalar,
    }
}

const fn immutable(path: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        path,
        mutability: Mutability::Immutable,
        shape: FieldShape::Scalar,
    }
}

const fn list(path: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        path,
        mutability: Mutability::Patchable,
        shape: FieldShape::List,
    }
}

const fn map(path: &'static str, add_supported: bool) -> FieldDescriptor {
    FieldDescriptor {
        path,
        mutability: Mutability::Patchable,
        shape: FieldShape::Map { add_supported },
    }
}

const fn identifier(name: &'static str) -> KeyPart {
    KeyPart {
        name,
        source: KeySource::Identifier,
    }
}

const fn assigned(name: &'static str) -> KeyPart {
    KeyPart {
        name,
        source: KeySource::Assigned,
    }
}

const fn reference(name: &'static str, target: Kind, slot: Slot) -> ReferenceDescriptor {
    ReferenceDescriptor { name, target, slot }
}

const REST_API_REF: ReferenceDescriptor =
    reference("restAPIRef", Kind::RestApi, Slot::Identifier("restApiId"));
const RESOURCE_REF: ReferenceDescriptor =
    reference("resourceRef", Kind::Resource, Slot::Identifier("resourceId"));

const REST_API_KEY: KeyPart = identifier("restApiId");
const RESOURCE_KEY: KeyPart = identifier("resourceId");
const HTTP_METHOD_KEY: KeyPart = identifier("httpMethod");
const STATUS_CODE_KEY: KeyPart = identifier("statusCode");

static REST_API: KindDescriptor = KindDescriptor {
    kind: Kind::RestApi,
    fields: &[
        scalar("/name"),
        scalar("/description"),
        scalar("/apiKeySource"),
        list("/binaryMediaTypes"),
        scalar("/disableExecuteApiEndpoint"),
        scalar("/endpointConfiguration/types/0"),
        list("/endpointConfiguration/vpcEndpointIds"),
        scalar("/minimumCompressionSize"),
        scalar("/policy"),
        immutable("/version"),
    ],
    key: &[assigned("restApiId")],
    references: &[],
    read_only: &["rootResourceId", "createdDate"],
    taggable: true,
    name_unique: false,
    sections: &[],
    busy: None,
};

static RESOURCE: KindDescriptor = KindDescriptor {
    kind: Kind::Resource,
    fields: &[scalar("/parentId"), scalar("/pathPart")],
    key: &[REST_API_KEY, assigned("resourceId")],
    references: &[
        REST_API_REF,
        reference("parentRef", Kind::Resource, Slot::Field("/parentId")),
    ],
    read_only: &["path"],
    taggable: false,
    name_unique: false,
    sections: &[],
    busy: None,
};

static METHOD: KindDescriptor = KindDescriptor {
    kind: Kind::Method,
    fields: &[
        scalar("/authorizationType"),
        scalar("/authorizerId"),
        scalar("/apiKeyRequired"),
        scalar("/operationName"),
        scalar("/requestValidatorId"),
        list("/authorizationScopes"),
        map("/requestParameters", true),
        map("/requestModels", true),
    ],
    key: &[REST_API_KEY, RESOURCE_KEY, HTTP_METHOD_KEY],
    references: &[
        REST_API_REF,
        RESOURCE_REF,
        reference("authorizerRef", Kind::Authorizer, Slot::Field("/authorizerId")),
    ],
    read_only: &[],
    taggable: false,
    name_unique: true,
    sections: &[],
    busy: None,
};

static METHOD_RESPONSE: KindDescriptor = KindDescriptor {
    kind: Kind::MethodResponse,
    fields: &[map("/responseParameters", true), map("/responseModels", true)],
    key: &[REST_API_KEY, RESOURCE_KEY, HTTP_METHOD_KEY, STATUS_CODE_KEY],
    references: &[REST_API_REF, RESOURCE_REF],
    read_only: &[],
    taggable: false,
    name_unique: true,
    sections: &[],
    busy: None,
};

static INTEGRATION: KindDescriptor = KindDescriptor {
    kind: Kind::Integration,
    fields: &[
        immutable("/type"),
        list("/cacheKeyParameters"),
        scalar("/cacheNamespace"),
        scalar("/connectionId"),
        scalar("/connectionType"),
        scalar("/contentHandling"),
        scalar("/credentials"),
        scalar("/httpMethod"),
        scalar("/passthroughBehavior"),
        map("/requestParameters", true),
        map("/requestTemplates", true),
        scalar("/timeoutInMillis"),
        scalar("/tlsConfig/insecureSkipVerification"),
        scalar("/uri"),
    ],
    key: &[REST_API_KEY, RESOURCE_KEY, HTTP_METHOD_KEY],
    references: &[
        REST_API_REF,
        RESOURCE_REF,
        reference("connectionRef", Kind::VpcLink, Slot::Field("/connectionId")),
    ],
    read_only: &[],
    taggable: false,
    name_unique: true,
    sections: &[],
    busy: None,
};

static INTEGRATION_RESPONSE: KindDescriptor = KindDescriptor {
    kind: Kind::IntegrationResponse,
    fields: &[
        scalar("/contentHandling"),
        scalar("/selectionPattern"),
        map("/responseParameters", true),
        map("/responseTemplates", true),
    ],
    key: &[REST_API_KEY, RESOURCE_KEY, HTTP_METHOD_KEY, STATUS_CODE_KEY],
    references: &[REST_API_REF, RESOURCE_REF],
    read_only: &[],
    taggable: false,
    name_unique: true,
    sections: &[],
    busy: None,
};

static DEPLOYMENT: KindDescriptor = KindDescriptor {
    kind: Kind::Deployment,
    fields: &[
        scalar("/description"),
        immutable("/stageName"),
        immutable("/stageDescription"),
        immutable("/canarySettings/percentTraffic"),
        FieldDescriptor {
            path: "/canarySettings/stageVariableOverrides",
            mutability: Mutability::Immutable,
            shape: FieldShape::Map {
                add_supported: false,
            },
        },
        immutable("/canarySettings/useStageCache"),
    ],
    key: &[REST_API_KEY, assigned("deploymentId")],
    references: &[REST_API_REF],
    read_only: &["createdDate"],
    taggable: false,
    name_unique: false,
    sections: &[],
    busy: None,
};

static STAGE: KindDescriptor = KindDescriptor {
    kind: Kind::Stage,
    fields: &[
        scalar("/deploymentId"),
        scalar("/description"),
        scalar("/cacheClusterEnabled"),
        scalar("/cacheClusterSize"),
        scalar("/tracingEnabled"),
        scalar("/documentationVersion"),
        map("/variables", false),
        scalar("/canarySettings/deploymentId"),
        scalar("/canarySettings/percentTraffic"),
        map("/canarySettings/stageVariableOverrides", false),
        scalar("/canarySettings/useStageCache"),
    ],
    key: &[REST_API_KEY, identifier("stageName")],
    references: &[
        REST_API_REF,
        reference("deploymentRef", Kind::Deployment, Slot::Field("/deploymentId")),
    ],
    read_only: &["createdDate", "lastUpdatedDate"],
    taggable: true,
    name_unique: true,
    sections: &["/canarySettings"],
    busy: None,
};

static AUTHORIZER: KindDescriptor = KindDescriptor {
    kind: Kind::Authorizer,
    fields: &[
        scalar("/name"),
        scalar("/type"),
        scalar("/authType"),
        scalar("/authorizerUri"),
        scalar("/authorizerCredentials"),
        scalar("/authorizerResultTtlInSeconds"),
        scalar("/identitySource"),
        scalar("/identityValidationExpression"),
        FieldDescriptor {
            path: "/providerARNs",
            mutability: Mutability::Patchable,
            shape: FieldShape::ValueList,
        },
    ],
    key: &[REST_API_KEY, assigned("authorizerId")],
    references: &[REST_API_REF],
    read_only: &[],
    taggable: false,
    name_unique: false,
    sections: &[],
    busy: None,
};

static API_KEY: KindDescriptor = KindDescriptor {
    kind: Kind::ApiKey,
    fields: &[
        scalar("/name"),
        scalar("/description"),
        scalar("/enabled"),
        scalar("/customerId"),
        list("/stages"),
        immutable("/value"),
        immutable("/generateDistinctId"),
    ],
    key: &[assigned("apiKeyId")],
    references: &[],
    read_only: &["createdDate"],
    taggable: true,
    name_unique: false,
    sections: &[],
    busy: None,
};

static VPC_LINK: KindDescriptor = KindDescriptor {
    kind: Kind::VpcLink,
    fields: &[
        scalar("/name"),
        scalar("/description"),
        FieldDescriptor {
            path: "/targetArns",
            mutability: Mutability::Immutable,
            shape: FieldShape::List,
        },
    ],
    key: &[assigned("vpcLinkId")],
    references: &[],
    read_only: &["status", "statusMessage"],
    taggable: true,
    name_unique: false,
    sections: &[],
    busy: Some(BusyGuard {
        field: "status",
        states: &["PENDING", "DELETING"],
    }),
};

pub(super) fn descriptor_for(kind: Kind) -> &'static KindDescriptor {
    match kind {
        Kind::RestApi => &REST_API,
        Kind::Resource => &RESOURCE,
        Kind::Method => &METHOD,
        Kind::MethodResponse => &METHOD_RESPONSE,
        Kind::Integration => &INTEGRATION,
        Kind::IntegrationResponse => &INTEGRATION_RESPONSE,
        Kind::Deployment => &DEPLOYMENT,
        Kind::Stage => &STAGE,
        Kind::Authorizer => &AUTHORIZER,
        Kind::ApiKey => &API_KEY,
        Kind::VpcLink => &VPC_LINK,
    }
}
